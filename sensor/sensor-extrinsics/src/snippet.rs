//! Markup snippets for derived transforms.
//!
//! The emitted block is meant to be pasted into the platform's static
//! description:
//!
//! ```text
//! <transform child="camera_front_optical" parent="camera_front_sensor">
//!   <origin xyz="0.1 -0.02 0.035" rpy="-1.5708 0 -1.5708"/>
//! </transform>
//! ```
//!
//! Numbers carry six significant digits, rotations are intrinsic XYZ Euler
//! angles in radians. Tools downstream parse this exact shape.

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::{ExtrinsicsError, Result};
use crate::frame::FrameName;
use crate::transform::{Decomposition, RigidTransform};

/// One indentation level.
const INDENT_UNIT: &str = "  ";

/// Significant digits kept for every emitted component.
const SIGNIFICANT_DIGITS: i32 = 6;

/// Digits after the point in the scientific form used for rounding.
const MANTISSA_DECIMALS: usize = 5;

/// Minimal element tree used to build snippets.
///
/// `text` is the content between the start tag and the first child, `tail`
/// the content between this element's end tag and the next sibling.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Tag name.
    pub tag: String,
    /// Attributes in output order.
    pub attributes: Vec<(String, String)>,
    /// Child elements.
    pub children: Vec<Element>,
    /// Text before the first child.
    pub text: Option<String>,
    /// Text after the end tag.
    pub tail: Option<String>,
}

impl Element {
    /// Creates an empty element.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Appends an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Appends a child element.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Sets the text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Serializes the element, its children and its tail.
    ///
    /// Elements without children or text use the empty-element form.
    ///
    /// # Errors
    ///
    /// Returns [`ExtrinsicsError::Markup`] if the writer fails.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        write_element(&mut writer, self)?;
        String::from_utf8(writer.into_inner())
            .map_err(|e| ExtrinsicsError::Markup(format!("invalid UTF-8 in generated markup: {e}")))
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.tag.as_str());
    for (name, value) in &element.attributes {
        start.push_attribute((name.as_str(), value.as_str()));
    }

    let text = element.text.as_deref().unwrap_or_default();
    if element.children.is_empty() && text.is_empty() {
        writer
            .write_event(Event::Empty(start))
            .map_err(|e| markup_error(&element.tag, &e))?;
    } else {
        writer
            .write_event(Event::Start(start))
            .map_err(|e| markup_error(&element.tag, &e))?;
        if !text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| markup_error(&element.tag, &e))?;
        }
        for child in &element.children {
            write_element(writer, child)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(element.tag.as_str())))
            .map_err(|e| markup_error(&element.tag, &e))?;
    }

    if let Some(tail) = element.tail.as_deref().filter(|t| !t.is_empty()) {
        writer
            .write_event(Event::Text(BytesText::new(tail)))
            .map_err(|e| markup_error(&element.tag, &e))?;
    }
    Ok(())
}

fn markup_error(tag: &str, error: &impl std::fmt::Display) -> ExtrinsicsError {
    ExtrinsicsError::Markup(format!("failed to write <{tag}>: {error}"))
}

/// Returns an indented copy of `element`.
///
/// Elements with children get a newline plus one unit per level before the
/// first child; every child ends with a newline indented to its own level,
/// except the last child, whose tail lines the parent's end tag up with its
/// start tag. Existing non-blank text and tails are kept. The outermost
/// element never gets a tail, so the snippet has no trailing newline.
#[must_use]
pub fn indent(element: &Element) -> Element {
    let mut root = indent_at(element, 0);
    root.tail = None;
    root
}

fn indent_at(element: &Element, depth: usize) -> Element {
    let own_level = line_break(depth);
    let mut children: Vec<Element> = element
        .children
        .iter()
        .map(|child| indent_at(child, depth + 1))
        .collect();
    let mut text = element.text.clone();
    let mut tail = element.tail.clone();

    if children.is_empty() {
        if depth > 0 && is_blank(tail.as_deref()) {
            tail = Some(own_level);
        }
    } else {
        if is_blank(text.as_deref()) {
            text = Some(line_break(depth + 1));
        }
        if is_blank(tail.as_deref()) {
            tail = Some(own_level.clone());
        }
        if let Some(last) = children.last_mut() {
            if is_blank(last.tail.as_deref()) {
                last.tail = Some(own_level);
            }
        }
    }

    Element {
        tag: element.tag.clone(),
        attributes: element.attributes.clone(),
        children,
        text,
        tail,
    }
}

fn line_break(depth: usize) -> String {
    format!("\n{}", INDENT_UNIT.repeat(depth))
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Formats a number with six significant digits, `%g` style.
///
/// Trailing zeros are dropped, magnitudes below `1e-4` or from `1e6` up use
/// scientific notation with a signed two-digit exponent, and negative zero
/// prints as `0`. The output never depends on locale.
///
/// # Example
///
/// ```
/// use sensor_extrinsics::format_component;
///
/// assert_eq!(format_component(1.234_567_89), "1.23457");
/// assert_eq!(format_component(-0.5), "-0.5");
/// assert_eq!(format_component(0.000_012_5), "1.25e-05");
/// assert_eq!(format_component(2_500_000.0), "2.5e+06");
/// ```
#[must_use]
pub fn format_component(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    if value == 0.0 {
        return "0".to_owned();
    }

    // Round once in scientific form so the exponent reflects carries like 9.999999 -> 10
    let scientific = format!("{value:.prec$e}", prec = MANTISSA_DECIMALS);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or_default();

    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let decimals = usize::try_from(SIGNIFICANT_DIGITS - 1 - exponent).unwrap_or_default();
        trim_fraction(&format!("{value:.decimals$}")).to_owned()
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

fn join_components(values: [f64; 3]) -> String {
    values
        .iter()
        .map(|v| format_component(*v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders the snippet for the edge `parent -> child`.
///
/// # Errors
///
/// Returns [`ExtrinsicsError::InvalidTransform`] if `transform` is not rigid
/// and [`ExtrinsicsError::Markup`] if serialization fails.
///
/// # Example
///
/// ```
/// use sensor_extrinsics::{emit, RigidTransform};
///
/// let snippet = emit(
///     &RigidTransform::from_translation(1.234_567_89, 0.0, 0.0),
///     &"camera_optical".into(),
///     &"lidar".into(),
/// )
/// .unwrap();
///
/// assert_eq!(
///     snippet,
///     "<transform child=\"lidar\" parent=\"camera_optical\">\n  \
///      <origin xyz=\"1.23457 0 0\" rpy=\"0 0 0\"/>\n</transform>"
/// );
/// ```
pub fn emit(transform: &RigidTransform, parent: &FrameName, child: &FrameName) -> Result<String> {
    let Decomposition { translation, euler } = transform.decompose()?;

    let origin = Element::new("origin")
        .with_attribute("xyz", join_components([translation.x, translation.y, translation.z]))
        .with_attribute("rpy", join_components([euler.roll, euler.pitch, euler.yaw]));
    let snippet = Element::new("transform")
        .with_attribute("child", child.as_str())
        .with_attribute("parent", parent.as_str())
        .with_child(origin);

    indent(&snippet).to_xml()
}
