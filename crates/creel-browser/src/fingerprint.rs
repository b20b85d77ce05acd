use rand::Rng;
use serde::{Deserialize, Serialize};

/// Browser identity presented to sites for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub user_agent: String,
    pub locale: String,
    pub timezone: String,
    pub viewport: Viewport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

struct AgentProfile {
    user_agent: &'static str,
    locale: &'static str,
    timezone: &'static str,
}

const AGENT_PROFILES: [AgentProfile; 4] = [
    AgentProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36",
        locale: "en-US",
        timezone: "America/New_York",
    },
    AgentProfile {
        user_agent: "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:114.0) Gecko/20100101 Firefox/114.0",
        locale: "de-DE",
        timezone: "Europe/Berlin",
    },
    AgentProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/113.0.0.0 Safari/537.36",
        locale: "en-GB",
        timezone: "Europe/London",
    },
    AgentProfile {
        user_agent: "Mozilla/5.0 (Linux; Android 10; Pixel 4) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Mobile Safari/537.36",
        locale: "en-CA",
        timezone: "America/Toronto",
    },
];

const VIEWPORTS: [(u32, u32); 5] = [
    (1366, 768),
    (1440, 900),
    (1536, 864),
    (1920, 1080),
    (1280, 800),
];

impl Fingerprint {
    /// Pick a profile and viewport independently from `rng`.
    pub fn pick<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let profile = &AGENT_PROFILES[rng.gen_range(0..AGENT_PROFILES.len())];
        let (width, height) = VIEWPORTS[rng.gen_range(0..VIEWPORTS.len())];

        Self {
            user_agent: profile.user_agent.to_string(),
            locale: profile.locale.to_string(),
            timezone: profile.timezone.to_string(),
            viewport: Viewport { width, height },
        }
    }

    /// Generate a randomized fingerprint
    #[must_use]
    pub fn randomized() -> Self {
        Self::pick(&mut rand::thread_rng())
    }

    /// `Accept-Language` value matching the locale.
    #[must_use]
    pub fn accept_language(&self) -> String {
        match self.locale.split_once('-') {
            Some((lang, _)) => format!("{},{lang};q=0.9", self.locale),
            None => self.locale.clone(),
        }
    }

    pub fn is_mobile(&self) -> bool {
        self.user_agent.contains("Mobile")
    }
}
