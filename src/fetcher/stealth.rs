//! Anti-detection measures
//!
//! Browser fingerprints, the init script that hides automation flags,
//! randomized interaction plans and block-page detection. Timings and
//! sequences here are empirically tuned and expected to need re-tuning as
//! the target sites change their defenses.

use super::renderer::{Interaction, Key};
use crate::site::SourceSite;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// Desktop user agents with their matching `navigator.platform`
const USER_AGENTS: &[(&str, &str)] = &[
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "Win32",
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "MacIntel",
    ),
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36 Edg/123.0.0.0",
        "Win32",
    ),
    (
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "Linux x86_64",
    ),
];

/// Common desktop resolutions
const VIEWPORTS: &[(u32, u32)] = &[(1366, 768), (1920, 1080), (1536, 864), (1440, 900)];

const LANGUAGES: &[&str] = &["pt-BR", "pt", "en-US", "en"];

/// Signatures of interstitial challenge pages
///
/// The Cloudflare `challenge-platform/scripts/jsd` beacon appears on normal
/// pages too, so only the interstitial's `/h/` path counts.
pub const BLOCK_MARKERS: &[&str] = &[
    "Just a moment...",
    "<title>Just a moment",
    "challenge-platform/h/",
    "cf-chl-",
    "Attention Required! | Cloudflare",
    "captcha-delivery.com",
    "px-captcha",
];

/// Fingerprint applied to a browsing context before navigation
#[derive(Debug, Clone, PartialEq)]
pub struct StealthProfile {
    pub user_agent: String,
    pub platform: String,
    pub languages: Vec<String>,
    pub viewport: (u32, u32),
}

impl Default for StealthProfile {
    fn default() -> Self {
        let (user_agent, platform) = USER_AGENTS[0];
        Self {
            user_agent: user_agent.to_string(),
            platform: platform.to_string(),
            languages: LANGUAGES.iter().map(|l| l.to_string()).collect(),
            viewport: VIEWPORTS[0],
        }
    }
}

impl StealthProfile {
    /// Picks the profile for a site
    ///
    /// Bot-defended sites get a randomized user agent and a jittered
    /// viewport on every call; the rest use the fixed default.
    pub fn for_site(site: SourceSite) -> Self {
        if !site.is_bot_defended() {
            return Self::default();
        }

        let mut rng = rand::thread_rng();
        let (user_agent, platform) = *USER_AGENTS.choose(&mut rng).unwrap_or(&USER_AGENTS[0]);
        let (width, height) = *VIEWPORTS.choose(&mut rng).unwrap_or(&VIEWPORTS[0]);

        Self {
            user_agent: user_agent.to_string(),
            platform: platform.to_string(),
            languages: LANGUAGES.iter().map(|l| l.to_string()).collect(),
            viewport: (width - rng.gen_range(0..40), height - rng.gen_range(0..60)),
        }
    }

    /// `Accept-Language` header matching `languages`
    pub fn accept_language(&self) -> String {
        self.languages
            .iter()
            .enumerate()
            .map(|(i, lang)| {
                if i == 0 {
                    lang.clone()
                } else {
                    format!("{};q={:.1}", lang, 1.0 - 0.1 * i as f64)
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Script evaluated in every new document before page scripts run
    pub fn init_script(&self) -> String {
        let languages = self
            .languages
            .iter()
            .map(|l| format!("'{}'", l))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            r#"
Object.defineProperty(navigator, 'webdriver', {{ get: () => undefined }});
window.chrome = window.chrome || {{ runtime: {{}} }};
Object.defineProperty(navigator, 'plugins', {{ get: () => [1, 2, 3, 4, 5] }});
Object.defineProperty(navigator, 'languages', {{ get: () => [{languages}] }});
Object.defineProperty(navigator, 'platform', {{ get: () => '{platform}' }});
"#,
            languages = languages,
            platform = self.platform,
        )
    }
}

/// Bounds for the random pauses between interactions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub min_pause: Duration,
    pub max_pause: Duration,
}

impl Pacing {
    fn pause(&self, rng: &mut impl Rng) -> Duration {
        if self.max_pause <= self.min_pause {
            return self.min_pause;
        }
        rng.gen_range(self.min_pause..=self.max_pause)
    }
}

/// Upper bound on steps in a plan
pub const MAX_PLAN_STEPS: usize = 16;

/// Builds a short randomized sequence: pointer moves, a wheel scroll,
/// a few arrow presses and a final `End`, each followed by a pause
pub fn interaction_plan(viewport: (u32, u32), pacing: Pacing) -> Vec<Interaction> {
    let mut rng = rand::thread_rng();
    let (width, height) = (viewport.0.max(2) as f64, viewport.1.max(2) as f64);
    let mut plan = Vec::with_capacity(MAX_PLAN_STEPS);

    for _ in 0..rng.gen_range(1..=2) {
        plan.push(Interaction::MouseMove {
            x: rng.gen_range(0.1..0.9) * width,
            y: rng.gen_range(0.1..0.9) * height,
        });
        plan.push(Interaction::Pause(pacing.pause(&mut rng)));
    }

    plan.push(Interaction::Scroll {
        delta_y: rng.gen_range(300.0..700.0),
    });
    plan.push(Interaction::Pause(pacing.pause(&mut rng)));

    for _ in 0..rng.gen_range(2..=4) {
        plan.push(Interaction::KeyPress(Key::ArrowDown));
    }
    plan.push(Interaction::Pause(pacing.pause(&mut rng)));

    plan.push(Interaction::KeyPress(Key::End));
    plan.push(Interaction::Pause(pacing.pause(&mut rng)));

    plan.truncate(MAX_PLAN_STEPS);
    plan
}

/// Returns the first block-page signature found in the HTML
pub fn detect_block(html: &str) -> Option<&'static str> {
    BLOCK_MARKERS.iter().copied().find(|marker| html.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacing(min_ms: u64, max_ms: u64) -> Pacing {
        Pacing {
            min_pause: Duration::from_millis(min_ms),
            max_pause: Duration::from_millis(max_ms),
        }
    }

    #[test]
    fn test_default_profile_for_quiet_sites() {
        assert_eq!(
            StealthProfile::for_site(SourceSite::HubUrbana),
            StealthProfile::default()
        );
        assert_eq!(
            StealthProfile::for_site(SourceSite::Unknown),
            StealthProfile::default()
        );
    }

    #[test]
    fn test_randomized_profile_stays_realistic() {
        for _ in 0..20 {
            let profile = StealthProfile::for_site(SourceSite::ImovelWeb);
            assert!(USER_AGENTS.iter().any(|(ua, _)| *ua == profile.user_agent));
            assert!(profile.viewport.0 >= 1326 && profile.viewport.0 <= 1920);
            assert!(profile.viewport.1 >= 708 && profile.viewport.1 <= 1080);
        }
    }

    #[test]
    fn test_init_script_hides_automation() {
        let script = StealthProfile::default().init_script();
        assert!(script.contains("'webdriver'"));
        assert!(script.contains("'plugins'"));
        assert!(script.contains("'pt-BR', 'pt', 'en-US', 'en'"));
        assert!(script.contains("Win32"));
    }

    #[test]
    fn test_accept_language() {
        assert_eq!(
            StealthProfile::default().accept_language(),
            "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7"
        );
    }

    #[test]
    fn test_plan_is_bounded_and_complete() {
        for _ in 0..20 {
            let plan = interaction_plan((1366, 768), pacing(10, 20));
            assert!(plan.len() <= MAX_PLAN_STEPS);
            assert!(plan.iter().any(|i| matches!(i, Interaction::MouseMove { .. })));
            assert!(plan.iter().any(|i| matches!(i, Interaction::Scroll { .. })));
            assert!(plan.contains(&Interaction::KeyPress(Key::End)));

            for step in &plan {
                match step {
                    Interaction::MouseMove { x, y } => {
                        assert!(*x >= 0.0 && *x <= 1366.0);
                        assert!(*y >= 0.0 && *y <= 768.0);
                    }
                    Interaction::Pause(d) => {
                        assert!(*d >= Duration::from_millis(10) && *d <= Duration::from_millis(20));
                    }
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn test_zero_pacing_yields_zero_pauses() {
        let plan = interaction_plan((800, 600), pacing(0, 0));
        assert!(plan
            .iter()
            .all(|i| !matches!(i, Interaction::Pause(d) if *d > Duration::ZERO)));
    }

    #[test]
    fn test_detect_block() {
        let challenge = "<html><head><title>Just a moment...</title></head></html>";
        assert_eq!(detect_block(challenge), Some("Just a moment..."));

        let interstitial = r#"<script src="/cdn-cgi/challenge-platform/h/b/orchestrate/chl_page/v1"></script>"#;
        assert_eq!(detect_block(interstitial), Some("challenge-platform/h/"));
    }

    #[test]
    fn test_normal_page_with_beacon_is_not_blocked() {
        let html = r#"<html><body><h1>Apartamento</h1>
            <script src="/cdn-cgi/challenge-platform/scripts/jsd/main.js"></script></body></html>"#;
        assert_eq!(detect_block(html), None);
    }
}
