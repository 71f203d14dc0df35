use crate::config::{default_true, lenient_delay, FillSettings};
use crate::types::{Profile, Template};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// A named profile as the profile editor stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub personal_info: Profile,
}

/// User-editable settings in their stored shape.
///
/// The switches that also exist in the settings file are optional: a
/// stored value wins, an absent one leaves the settings file in charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_fill_enabled: Option<bool>,
    #[serde(default = "default_true")]
    pub show_floating_button: bool,
    #[serde(default = "default_button_position")]
    pub button_position: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_stored_delay"
    )]
    pub fill_delay: Option<u64>,
}

fn default_button_position() -> String {
    "bottom-right".to_string()
}

// Present but unparseable still counts as stored (and falls back to the default delay)
fn lenient_stored_delay<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    lenient_delay(deserializer).map(Some)
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            auto_fill_enabled: None,
            show_floating_button: true,
            button_position: default_button_position(),
            fill_delay: None,
        }
    }
}

impl StoredSettings {
    /// Overlay the user's stored switches onto engine settings.
    pub fn apply_to(&self, settings: &mut FillSettings) {
        if let Some(enabled) = self.auto_fill_enabled {
            settings.enabled = enabled;
        }
        if let Some(delay) = self.fill_delay {
            settings.fill_delay_ms = delay;
        }
    }
}

/// Everything the extension persists: profiles, templates and settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredData {
    #[serde(default)]
    pub profiles: Vec<StoredProfile>,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub settings: StoredSettings,
}

/// Snapshot handed out by "export data".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedData {
    pub profiles: Vec<StoredProfile>,
    pub templates: Vec<Template>,
    pub settings: StoredSettings,
    pub export_date: DateTime<Utc>,
}

impl StoredData {
    /// Profile selected as active, if it still exists.
    pub fn active_profile(&self) -> Option<&StoredProfile> {
        let id = self.active_profile.as_deref()?;
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn set_active_profile(&mut self, id: &str) -> Result<()> {
        if !self.profiles.iter().any(|p| p.id == id) {
            return Err(anyhow!("No profile with id {id:?}"));
        }
        self.active_profile = Some(id.to_string());
        Ok(())
    }

    pub fn export(&self) -> ExportedData {
        ExportedData {
            profiles: self.profiles.clone(),
            templates: self.templates.clone(),
            settings: self.settings.clone(),
            export_date: Utc::now(),
        }
    }

    /// Replace everything with an exported snapshot. The first profile
    /// becomes active when the old active id is gone.
    pub fn import(&mut self, exported: ExportedData) {
        self.profiles = exported.profiles;
        self.templates = exported.templates;
        self.settings = exported.settings;
        if self.active_profile().is_none() {
            self.active_profile = self.profiles.first().map(|p| p.id.clone());
        }
    }

    /// Engine settings for a pass, with the user's switches applied.
    pub fn fill_settings(&self, base: &FillSettings) -> FillSettings {
        let mut settings = base.clone();
        self.settings.apply_to(&mut settings);
        settings
    }
}

/// Problems that keep a profile from being saved. Empty means valid.
pub fn validate_profile(profile: &StoredProfile) -> Vec<String> {
    let info = &profile.personal_info;
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    let mut errors = Vec::new();

    if !present(&info.first_name) {
        errors.push("First name is required".to_string());
    }
    if !present(&info.last_name) {
        errors.push("Last name is required".to_string());
    }
    match info.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        None => errors.push("Email is required".to_string()),
        Some(email) if !EMAIL_REGEX.is_match(email) => {
            errors.push("Invalid email format".to_string())
        }
        Some(_) => {}
    }

    errors
}

fn text(value: &str) -> Option<String> {
    Some(value.to_string())
}

fn template(id: &str, question: &str, answers: &[&str]) -> Template {
    Template {
        id: id.to_string(),
        question: question.to_string(),
        answers: answers.iter().map(|a| a.to_string()).collect(),
    }
}

/// First-run data: a placeholder profile, four common interview questions
/// and default settings.
pub fn default_data() -> StoredData {
    let mut personal_info = Profile {
        first_name: text("John"),
        last_name: text("Doe"),
        email: text("john.doe@email.com"),
        phone: text("+1-555-0123"),
        address: text("123 Main Street, San Francisco, CA 94102"),
        linkedin: text("https://linkedin.com/in/johndoe"),
        github: text("https://github.com/johndoe"),
        website: text("https://johndoe.dev"),
        education: text("Bachelor of Science in Computer Science"),
        experience: text("2+ years"),
        ..Default::default()
    };
    for (key, value) in [
        ("university", "University of California, Berkeley"),
        ("graduationYear", "2023"),
        ("currentRole", "Software Engineer"),
    ] {
        personal_info
            .extra
            .insert(key.to_string(), serde_json::Value::String(value.to_string()));
    }

    StoredData {
        profiles: vec![StoredProfile {
            id: "default".to_string(),
            name: "Default Profile".to_string(),
            personal_info,
        }],
        active_profile: Some("default".to_string()),
        templates: vec![
            template(
                "tell-about-yourself",
                "Tell me about yourself",
                &[
                    "I am a motivated professional with strong analytical and problem-solving skills. I thrive in collaborative environments and am passionate about continuous learning and growth.",
                    "As a dedicated team player with excellent communication skills, I bring a unique combination of technical expertise and creative thinking to every project I work on.",
                    "I am a results-driven professional who enjoys tackling complex challenges and delivering high-quality solutions that exceed expectations.",
                ],
            ),
            template(
                "why-company",
                "Why do you want to work here?",
                &[
                    "I am impressed by your company's commitment to innovation and excellence. The opportunity to contribute to meaningful projects while growing professionally is exactly what I'm looking for.",
                    "Your company's reputation for fostering a collaborative culture and supporting employee development aligns perfectly with my career goals and values.",
                    "The opportunity to work with a talented team on impactful projects while contributing to the company's continued success is incredibly appealing to me.",
                ],
            ),
            template(
                "greatest-strength",
                "What is your greatest strength?",
                &[
                    "My greatest strength is my ability to adapt quickly to new situations and learn from challenges. I approach problems with a positive attitude and find creative solutions.",
                    "I excel at building strong relationships and collaborating effectively with diverse teams to achieve common goals and deliver exceptional results.",
                    "My attention to detail and commitment to quality ensures that I consistently deliver high-standard work while meeting deadlines and exceeding expectations.",
                ],
            ),
            template(
                "career-goals",
                "Where do you see yourself in 5 years?",
                &[
                    "In five years, I see myself having grown both professionally and personally, taking on greater responsibilities while continuing to contribute meaningfully to my organization's success.",
                    "I envision myself in a leadership role where I can mentor others while continuing to develop my skills and make a significant impact in my field.",
                    "I aim to be recognized as a subject matter expert in my area, contributing to strategic initiatives while maintaining a strong focus on professional development and innovation.",
                ],
            ),
        ],
        settings: StoredSettings::default(),
    }
}

/// Storage abstraction for the persisted profiles, templates and settings
pub trait DataStore {
    fn load(&self) -> Result<StoredData>;
    fn save(&self, data: &StoredData) -> Result<()>;
}

/// JSON file on disk. A missing file reads as first-run defaults.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write first-run defaults unless the file already exists.
    pub fn init_defaults(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.save(&default_data())?;
        tracing::info!("💾 Default data written to {}", self.path.display());
        Ok(true)
    }
}

impl DataStore for FileStore {
    fn load(&self) -> Result<StoredData> {
        if !self.path.exists() {
            tracing::debug!("No data file at {}, using defaults", self.path.display());
            return Ok(default_data());
        }
        let json_str = fs::read_to_string(&self.path)?;
        let data: StoredData = serde_json::from_str(&json_str)
            .map_err(|e| anyhow!("Failed to parse {}: {}", self.path.display(), e))?;
        Ok(data)
    }

    fn save(&self, data: &StoredData) -> Result<()> {
        let json_str = serde_json::to_string_pretty(data)
            .map_err(|e| anyhow!("Failed to serialize stored data: {}", e))?;
        fs::write(&self.path, json_str)?;
        Ok(())
    }
}

/// In-memory store for tests and embedding.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<StoredData>,
}

impl MemoryStore {
    pub fn new(data: StoredData) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }
}

impl DataStore for MemoryStore {
    fn load(&self) -> Result<StoredData> {
        let data = self
            .data
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(data.clone())
    }

    fn save(&self, data: &StoredData) -> Result<()> {
        let mut stored = self
            .data
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        *stored = data.clone();
        Ok(())
    }
}
