/// One of the three colour targets of the G-buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GBufferAttachment {
    Position,
    Normal,
    AlbedoSpecular,
}

impl GBufferAttachment {
    pub const ALL: [GBufferAttachment; 3] = [
        GBufferAttachment::Position,
        GBufferAttachment::Normal,
        GBufferAttachment::AlbedoSpecular,
    ];

    /// Name of the sampler uniform the lighting program reads it through.
    pub fn sampler_name(self) -> &'static str {
        match self {
            GBufferAttachment::Position => "gPosition",
            GBufferAttachment::Normal => "gNormal",
            GBufferAttachment::AlbedoSpecular => "gAlbedoSpec",
        }
    }

    /// Fixed texture unit the attachment is bound to for the scene lifetime.
    pub fn texture_unit(self) -> u32 {
        match self {
            GBufferAttachment::Position => 0,
            GBufferAttachment::Normal => 1,
            GBufferAttachment::AlbedoSpecular => 2,
        }
    }

    pub fn format(self) -> TargetFormat {
        match self {
            GBufferAttachment::Position | GBufferAttachment::Normal => TargetFormat::Rgba16Float,
            GBufferAttachment::AlbedoSpecular => TargetFormat::Rgba8Unorm,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetFormat {
    Rgba16Float,
    Rgba8Unorm,
    Depth16Unorm,
}

/// Resolution of the G-buffer; every attachment shares it, depth included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GBufferLayout {
    pub width: u32,
    pub height: u32,
}

impl GBufferLayout {
    pub const DEPTH_FORMAT: TargetFormat = TargetFormat::Depth16Unorm;

    pub fn new(width: u32, height: u32) -> GBufferLayout {
        GBufferLayout { width, height }
    }

    pub fn dimensions(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Lighting-pass output selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    Combined,
    Position,
    Normal,
    Albedo,
    Specular,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 5] = [
        DisplayMode::Combined,
        DisplayMode::Position,
        DisplayMode::Normal,
        DisplayMode::Albedo,
        DisplayMode::Specular,
    ];

    pub fn as_uniform(self) -> i32 {
        match self {
            DisplayMode::Combined => 0,
            DisplayMode::Position => 1,
            DisplayMode::Normal => 2,
            DisplayMode::Albedo => 3,
            DisplayMode::Specular => 4,
        }
    }

    pub fn from_uniform(value: i32) -> DisplayMode {
        match value {
            1 => DisplayMode::Position,
            2 => DisplayMode::Normal,
            3 => DisplayMode::Albedo,
            4 => DisplayMode::Specular,
            _ => DisplayMode::Combined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachments_use_distinct_units() {
        let units: Vec<u32> = GBufferAttachment::ALL.iter().map(|a| a.texture_unit()).collect();
        assert_eq!(units, vec![0, 1, 2]);
    }

    #[test]
    fn display_mode_uniform_values() {
        for mode in DisplayMode::ALL {
            assert_eq!(DisplayMode::from_uniform(mode.as_uniform()), mode);
        }
        assert_eq!(DisplayMode::from_uniform(17), DisplayMode::Combined);
    }
}
