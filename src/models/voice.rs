use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    #[default]
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceLanguage {
    #[default]
    #[serde(rename = "fr-CA")]
    FrCa,
    #[serde(rename = "fr-FR")]
    FrFr,
    #[serde(rename = "en-CA")]
    EnCa,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Personality {
    #[default]
    Normal,
    Savage,
    Poete,
    Coach,
}

impl Personality {
    pub const ALL: [Personality; 4] = [
        Personality::Normal,
        Personality::Savage,
        Personality::Poete,
        Personality::Coach,
    ];

    /// Greeting the assistant speaks when the user tests a voice.
    pub fn preview_phrase(&self) -> &'static str {
        match self {
            Personality::Normal => "Salut! Moi c'est Ti-Guy, ton assistant québécois! Tiguidou?",
            Personality::Savage => "Yo! Ti-Guy ici. Prêt à faire du feu? Let's go tabarnak!",
            Personality::Poete => "Bonjour, je suis Ti-Guy, poète des réseaux sociaux québécois...",
            Personality::Coach => "Hey champion! Ti-Guy ici pour te motiver! Tu vas crusher ça!",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Personality::Normal => "Amical et utile",
            Personality::Savage => "Roasts tes posts",
            Personality::Poete => "Captions artistiques",
            Personality::Coach => "Motivationnel",
        }
    }
}

/// Voice-assistant preferences, stored as camelCase JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSettings {
    pub enabled: bool,
    pub auto_play: bool,
    pub voice: VoiceGender,

    #[validate(range(min = 0.5, max = 2.0, message = "Speed must be between 0.5 and 2.0"))]
    pub speed: f32,

    #[validate(range(min = 0.0, max = 1.0, message = "Volume must be between 0.0 and 1.0"))]
    pub volume: f32,

    pub language: VoiceLanguage,
    pub personality: Personality,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_play: false,
            voice: VoiceGender::Male,
            speed: 1.0,
            volume: 1.0,
            language: VoiceLanguage::FrCa,
            personality: Personality::Normal,
        }
    }
}
