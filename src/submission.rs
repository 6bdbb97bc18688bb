//! Validation of raw generation input.
//!
//! [`GenerationForm`] carries the fields exactly as the user typed them.
//! [`GenerationForm::validate`] turns it into a typed [`Submission`] or a
//! [`ValidationError`] without touching the network.

use crate::backend::GenerationRequest;
use crate::config::Catalog;
use crate::error::ValidationError;

pub const DEFAULT_DURATION: &str = "5";
pub const DEFAULT_FPS: &str = "24";
pub const DEFAULT_RESOLUTION: &str = "1024x576";
pub const DEFAULT_GUIDANCE_SCALE: &str = "7.5";

/// Unvalidated generation input.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationForm {
    pub model: Option<String>,
    pub prompt: String,
    pub duration: String,
    pub fps: String,
    pub resolution: String,
    pub guidance_scale: String,
    /// Blank means "let the backend pick".
    pub seed: Option<String>,
}

impl Default for GenerationForm {
    fn default() -> Self {
        Self {
            model: None,
            prompt: String::new(),
            duration: DEFAULT_DURATION.to_string(),
            fps: DEFAULT_FPS.to_string(),
            resolution: DEFAULT_RESOLUTION.to_string(),
            guidance_scale: DEFAULT_GUIDANCE_SCALE.to_string(),
            seed: None,
        }
    }
}

/// A validated request addressed to one backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub model: String,
    pub request: GenerationRequest,
}

impl GenerationForm {
    pub fn validate(&self, catalog: &Catalog) -> Result<Submission, ValidationError> {
        let model = self
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or(ValidationError::MissingModel)?;
        if !catalog.contains(model) {
            return Err(ValidationError::UnknownModel(model.to_string()));
        }

        if self.prompt.trim().is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }

        let duration = parse_whole("duration", &self.duration)?;
        let fps = parse_whole("fps", &self.fps)?;
        let guidance_scale = parse_decimal("guidance_scale", &self.guidance_scale)?;
        let seed = match self.seed.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_whole("seed", raw)?),
        };

        let resolution = self.resolution.trim();
        if !is_resolution(resolution) {
            return Err(ValidationError::InvalidResolution(self.resolution.clone()));
        }

        Ok(Submission {
            model: model.to_string(),
            request: GenerationRequest {
                prompt: self.prompt.clone(),
                duration,
                fps,
                resolution: resolution.to_string(),
                guidance_scale,
                seed,
            },
        })
    }
}

fn parse_whole<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, ValidationError> {
    raw.trim().parse().map_err(|_| ValidationError::InvalidNumber {
        field,
        expected: "a whole number",
        value: raw.to_string(),
    })
}

fn parse_decimal(field: &'static str, raw: &str) -> Result<f64, ValidationError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::InvalidNumber {
            field,
            expected: "a number",
            value: raw.to_string(),
        })
}

// "1024x576": two positive integers joined by a lowercase `x`.
fn is_resolution(raw: &str) -> bool {
    match raw.split_once('x') {
        Some((w, h)) => {
            matches!(w.parse::<u32>(), Ok(v) if v > 0) && matches!(h.parse::<u32>(), Ok(v) if v > 0)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoordinatorConfig;

    fn catalog() -> Catalog {
        CoordinatorConfig::default().backends
    }

    fn form() -> GenerationForm {
        GenerationForm {
            model: Some("waver".into()),
            prompt: "a cat".into(),
            ..GenerationForm::default()
        }
    }

    #[test]
    fn valid_form_uses_defaults() {
        let submission = form().validate(&catalog()).unwrap();
        assert_eq!(submission.model, "waver");
        assert_eq!(submission.request.duration, 5);
        assert_eq!(submission.request.fps, 24);
        assert_eq!(submission.request.resolution, "1024x576");
        assert_eq!(submission.request.guidance_scale, 7.5);
        assert_eq!(submission.request.seed, None);
    }

    #[test]
    fn missing_model_is_a_validation_error() {
        let mut f = form();
        f.model = None;
        assert_eq!(f.validate(&catalog()), Err(ValidationError::MissingModel));

        f.model = Some("   ".into());
        assert_eq!(f.validate(&catalog()), Err(ValidationError::MissingModel));
    }

    #[test]
    fn unknown_model_is_rejected() {
        let mut f = form();
        f.model = Some("sora".into());
        assert_eq!(
            f.validate(&catalog()),
            Err(ValidationError::UnknownModel("sora".into()))
        );
    }

    #[test]
    fn empty_prompt_is_rejected() {
        let mut f = form();
        f.prompt = "  \n".into();
        assert_eq!(f.validate(&catalog()), Err(ValidationError::EmptyPrompt));
    }

    #[test]
    fn non_numeric_fields_are_rejected() {
        let mut f = form();
        f.duration = "five".into();
        assert!(matches!(
            f.validate(&catalog()),
            Err(ValidationError::InvalidNumber { field: "duration", .. })
        ));

        let mut f = form();
        f.fps = "24.5".into();
        assert!(matches!(
            f.validate(&catalog()),
            Err(ValidationError::InvalidNumber { field: "fps", .. })
        ));

        let mut f = form();
        f.guidance_scale = "NaN".into();
        assert!(matches!(
            f.validate(&catalog()),
            Err(ValidationError::InvalidNumber { field: "guidance_scale", .. })
        ));
    }

    #[test]
    fn seed_is_optional() {
        let mut f = form();
        f.seed = Some("".into());
        assert_eq!(f.validate(&catalog()).unwrap().request.seed, None);

        f.seed = Some("42".into());
        assert_eq!(f.validate(&catalog()).unwrap().request.seed, Some(42));

        f.seed = Some("-1".into());
        assert!(matches!(
            f.validate(&catalog()),
            Err(ValidationError::InvalidNumber { field: "seed", .. })
        ));
    }

    #[test]
    fn resolution_must_be_width_x_height() {
        let mut f = form();
        f.resolution = "1920x1080".into();
        assert_eq!(f.validate(&catalog()).unwrap().request.resolution, "1920x1080");

        for bad in ["1080p", "x576", "1024x", "0x576", "1024*576"] {
            f.resolution = bad.into();
            assert!(
                matches!(f.validate(&catalog()), Err(ValidationError::InvalidResolution(_))),
                "{bad} should be rejected"
            );
        }
    }
}
