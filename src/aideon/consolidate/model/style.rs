//! Cell style value types.
//!
//! Every component is a plain owned value so cloning a [`CellStyle`] yields a
//! fully independent copy. Colours are stored resolved to RGB so a style stays
//! meaningful once it leaves the workbook whose theme and palette defined it.

/// 24-bit RGB colour (`0xRRGGBB`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u32);

impl Rgb {
    /// Parses the OOXML `AARRGGBB` / `RRGGBB` hexadecimal form, dropping alpha.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        let value = u32::from_str_radix(hex, 16).ok()?;
        match hex.len() {
            6 | 8 => Some(Rgb(value & 0x00FF_FFFF)),
            _ => None,
        }
    }

    pub fn red(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    pub fn green(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    pub fn blue(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Underline {
    #[default]
    None,
    Single,
    Double,
    SingleAccounting,
    DoubleAccounting,
}

impl Underline {
    /// Maps the `val` attribute of `<u>`; a bare `<u/>` means single.
    pub fn from_ooxml(value: Option<&str>) -> Self {
        match value {
            None | Some("single") => Underline::Single,
            Some("double") => Underline::Double,
            Some("singleAccounting") => Underline::SingleAccounting,
            Some("doubleAccounting") => Underline::DoubleAccounting,
            Some(_) => Underline::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontScript {
    #[default]
    Baseline,
    Superscript,
    Subscript,
}

impl FontScript {
    pub fn from_ooxml(value: &str) -> Self {
        match value {
            "superscript" => FontScript::Superscript,
            "subscript" => FontScript::Subscript,
            _ => FontScript::Baseline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Font {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub underline: Underline,
    pub strikethrough: bool,
    pub color: Option<Rgb>,
    pub script: FontScript,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderLine {
    #[default]
    None,
    Thin,
    Medium,
    Dashed,
    Dotted,
    Thick,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

impl BorderLine {
    pub fn from_ooxml(value: &str) -> Self {
        match value {
            "thin" => BorderLine::Thin,
            "medium" => BorderLine::Medium,
            "dashed" => BorderLine::Dashed,
            "dotted" => BorderLine::Dotted,
            "thick" => BorderLine::Thick,
            "double" => BorderLine::Double,
            "hair" => BorderLine::Hair,
            "mediumDashed" => BorderLine::MediumDashed,
            "dashDot" => BorderLine::DashDot,
            "mediumDashDot" => BorderLine::MediumDashDot,
            "dashDotDot" => BorderLine::DashDotDot,
            "mediumDashDotDot" => BorderLine::MediumDashDotDot,
            "slantDashDot" => BorderLine::SlantDashDot,
            _ => BorderLine::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BorderEdge {
    pub line: BorderLine,
    pub color: Option<Rgb>,
}

impl BorderEdge {
    pub fn is_visible(&self) -> bool {
        self.line != BorderLine::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Border {
    pub left: BorderEdge,
    pub right: BorderEdge,
    pub top: BorderEdge,
    pub bottom: BorderEdge,
    pub diagonal: BorderEdge,
    pub diagonal_up: bool,
    pub diagonal_down: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillPattern {
    #[default]
    None,
    Solid,
    MediumGray,
    DarkGray,
    LightGray,
    DarkHorizontal,
    DarkVertical,
    DarkDown,
    DarkUp,
    DarkGrid,
    DarkTrellis,
    LightHorizontal,
    LightVertical,
    LightDown,
    LightUp,
    LightGrid,
    LightTrellis,
    Gray125,
    Gray0625,
}

impl FillPattern {
    pub fn from_ooxml(value: &str) -> Self {
        match value {
            "solid" => FillPattern::Solid,
            "mediumGray" => FillPattern::MediumGray,
            "darkGray" => FillPattern::DarkGray,
            "lightGray" => FillPattern::LightGray,
            "darkHorizontal" => FillPattern::DarkHorizontal,
            "darkVertical" => FillPattern::DarkVertical,
            "darkDown" => FillPattern::DarkDown,
            "darkUp" => FillPattern::DarkUp,
            "darkGrid" => FillPattern::DarkGrid,
            "darkTrellis" => FillPattern::DarkTrellis,
            "lightHorizontal" => FillPattern::LightHorizontal,
            "lightVertical" => FillPattern::LightVertical,
            "lightDown" => FillPattern::LightDown,
            "lightUp" => FillPattern::LightUp,
            "lightGrid" => FillPattern::LightGrid,
            "lightTrellis" => FillPattern::LightTrellis,
            "gray125" => FillPattern::Gray125,
            "gray0625" => FillPattern::Gray0625,
            _ => FillPattern::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fill {
    pub pattern: FillPattern,
    pub foreground: Option<Rgb>,
    pub background: Option<Rgb>,
}

/// Number format as referenced by the source: built-in ids (< 164) keep
/// their id so locale-dependent formats survive; custom ones carry the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    pub id: u32,
    pub code: String,
}

impl NumberFormat {
    /// First id Excel assigns to user-defined formats.
    pub const FIRST_CUSTOM_ID: u32 = 164;

    pub fn is_builtin(&self) -> bool {
        self.id < Self::FIRST_CUSTOM_ID
    }

    pub fn is_general(&self) -> bool {
        self.id == 0
    }
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            id: 0,
            code: "General".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protection {
    pub locked: bool,
    pub hidden: bool,
}

impl Default for Protection {
    fn default() -> Self {
        Self {
            locked: true,
            hidden: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlign {
    #[default]
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterContinuous,
    Distributed,
}

impl HorizontalAlign {
    pub fn from_ooxml(value: &str) -> Self {
        match value {
            "left" => HorizontalAlign::Left,
            "center" => HorizontalAlign::Center,
            "right" => HorizontalAlign::Right,
            "fill" => HorizontalAlign::Fill,
            "justify" => HorizontalAlign::Justify,
            "centerContinuous" => HorizontalAlign::CenterContinuous,
            "distributed" => HorizontalAlign::Distributed,
            _ => HorizontalAlign::General,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlign {
    #[default]
    Bottom,
    Top,
    Center,
    Justify,
    Distributed,
}

impl VerticalAlign {
    pub fn from_ooxml(value: &str) -> Self {
        match value {
            "top" => VerticalAlign::Top,
            "center" => VerticalAlign::Center,
            "justify" => VerticalAlign::Justify,
            "distributed" => VerticalAlign::Distributed,
            _ => VerticalAlign::Bottom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Alignment {
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
    pub wrap_text: bool,
    pub shrink_to_fit: bool,
    pub indent: u8,
    /// Raw OOXML `textRotation`: 0-90 counter-clockwise, 91-180 clockwise
    /// (`90 - value` degrees), 255 for stacked text.
    pub rotation: u16,
}

/// Composite visual descriptor of a cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellStyle {
    pub font: Font,
    pub border: Border,
    pub fill: Fill,
    pub number_format: NumberFormat,
    pub protection: Protection,
    pub alignment: Alignment,
}
