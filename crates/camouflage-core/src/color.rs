use crate::constants::PALETTE_SIZE;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::{error::Error, fmt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    InvalidColorCode(i64),
    InvalidHex(String),
}

impl fmt::Display for ColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorError::InvalidColorCode(code) => {
                write!(f, "color code {code} is outside 1..={PALETTE_SIZE}")
            }
            ColorError::InvalidHex(raw) => write!(f, "'{raw}' is not a #RRGGBB or #RGB color"),
        }
    }
}

impl Error for ColorError {}

/// 8-bit RGB triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    const fn from_packed(hex: u32) -> Self {
        Self::new((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    /// Euclidean distance in raw RGB space (not perceptual).
    pub fn distance(self, other: Rgb) -> f64 {
        let dr = f64::from(self.r) - f64::from(other.r);
        let dg = f64::from(self.g) - f64::from(other.g);
        let db = f64::from(self.b) - f64::from(other.b);
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = ColorError;

    /// Accepts `#RRGGBB`, `RRGGBB` and the `#RGB` shorthand.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ColorError::InvalidHex(s.to_string());
        let digits = s.trim().trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(invalid()),
        };
        let packed = u32::from_str_radix(&expanded, 16).map_err(|_| invalid())?;
        Ok(Rgb::from_packed(packed))
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// Coarse band of the palette. Mutation can be confined to a single family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColorFamily {
    Reds = 1,
    YellowsAndGreens = 2,
    Blues = 3,
    Grays = 4,
}

impl ColorFamily {
    pub fn id(self) -> u8 {
        self as u8
    }
}

const PALETTE: [Rgb; PALETTE_SIZE as usize] = [
    Rgb::from_packed(0xD93131),
    Rgb::from_packed(0xE64A4A),
    Rgb::from_packed(0xB82828),
    Rgb::from_packed(0xFF5C5C),
    Rgb::from_packed(0xCC5151),
    Rgb::from_packed(0xD98C8C),
    Rgb::from_packed(0xE0A0A0),
    Rgb::from_packed(0xFF9900),
    Rgb::from_packed(0xFFC033),
    Rgb::from_packed(0xFFCC00),
    Rgb::from_packed(0xFFCC33),
    Rgb::from_packed(0xFFFF00),
    Rgb::from_packed(0xFFCC00),
    Rgb::from_packed(0xB3B300),
    Rgb::from_packed(0x38761D),
    Rgb::from_packed(0x2D6317),
    Rgb::from_packed(0x265513),
    Rgb::from_packed(0x1F450E),
    Rgb::from_packed(0x5CB85C),
    Rgb::from_packed(0x50A850),
    Rgb::from_packed(0x469A46),
    Rgb::from_packed(0x0033CC),
    Rgb::from_packed(0x002DAA),
    Rgb::from_packed(0x002788),
    Rgb::from_packed(0x0099FF),
    Rgb::from_packed(0x33CCFF),
    Rgb::from_packed(0x66CCFF),
    Rgb::from_packed(0x99CCFF),
    Rgb::from_packed(0x333333),
    Rgb::from_packed(0x3D3D3D),
    Rgb::from_packed(0x666666),
    Rgb::from_packed(0x999999),
    Rgb::from_packed(0xCCCCCC),
    Rgb::from_packed(0xE6E6E6),
    Rgb::from_packed(0xF2F2F2),
];

/// A palette entry, always within `1..=PALETTE_SIZE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ColorCode(u8);

impl ColorCode {
    pub fn new(code: u8) -> Result<Self, ColorError> {
        if (1..=PALETTE_SIZE).contains(&code) {
            Ok(Self(code))
        } else {
            Err(ColorError::InvalidColorCode(i64::from(code)))
        }
    }

    /// Every code in ascending order.
    pub fn all() -> impl Iterator<Item = ColorCode> {
        (1..=PALETTE_SIZE).map(ColorCode)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn rgb(self) -> Rgb {
        PALETTE[usize::from(self.0 - 1)]
    }

    pub fn family(self) -> ColorFamily {
        match self.0 {
            1..=7 => ColorFamily::Reds,
            8..=21 => ColorFamily::YellowsAndGreens,
            22..=28 => ColorFamily::Blues,
            _ => ColorFamily::Grays,
        }
    }

    /// Step `delta` positions around the ring, wrapping past either end.
    pub fn offset(self, delta: i32) -> ColorCode {
        let size = i32::from(PALETTE_SIZE);
        let zero_based = (i32::from(self.0) - 1 + delta).rem_euclid(size);
        ColorCode(zero_based as u8 + 1)
    }

    /// Shorter of the two arcs between two codes on the ring.
    pub fn ring_distance(self, other: ColorCode) -> u8 {
        let diff = self.0.abs_diff(other.0);
        diff.min(PALETTE_SIZE - diff)
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for ColorCode {
    type Error = ColorError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ColorCode::new(value)
    }
}

impl TryFrom<i64> for ColorCode {
    type Error = ColorError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| ColorError::InvalidColorCode(value))
            .and_then(ColorCode::new)
    }
}

impl From<ColorCode> for u8 {
    fn from(value: ColorCode) -> Self {
        value.0
    }
}
