use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::{info, warn};

use crate::error::RecapError;
use crate::mailer::report::ReportContext;

pub const WEEKLY_RECAP_TEMPLATE: &str = "score.html";
pub const APOLOGY_TEMPLATE: &str = "excuses.html";

/// Templates this service knows about and the fields each may reference.
const KNOWN_TEMPLATES: &[(&str, &[&str])] = &[
    (
        WEEKLY_RECAP_TEMPLATE,
        &["name", "seances", "last_workout_date", "total_exercises", "repstotal"],
    ),
    (APOLOGY_TEMPLATE, &["name"]),
];

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"\{([a-z_][a-z0-9_]*)\}").unwrap();
}

#[derive(Debug, Clone)]
struct Template {
    body: String,
    tokens: BTreeSet<String>,
}

impl Template {
    fn parse(name: &str, body: String, allowed: &[&str]) -> Result<Self, RecapError> {
        let tokens: BTreeSet<String> = TOKEN_RE
            .captures_iter(&body)
            .map(|c| c[1].to_string())
            .collect();
        if let Some(unknown) = tokens.iter().find(|t| !allowed.contains(&t.as_str())) {
            return Err(RecapError::Configuration(format!(
                "template {name} references unknown field {{{unknown}}}"
            )));
        }
        Ok(Self { body, tokens })
    }
}

/// Templates loaded once at start-up, rendered by flat `{field}` substitution.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, RecapError> {
        let dir = dir.as_ref();
        let mut templates = HashMap::new();
        for (name, allowed) in KNOWN_TEMPLATES {
            let path = dir.join(name);
            match std::fs::read_to_string(&path) {
                Ok(body) => {
                    let template = Template::parse(name, body, allowed)?;
                    info!(template = %name, fields = template.tokens.len(), "template loaded");
                    templates.insert(name.to_string(), template);
                }
                Err(e) => {
                    warn!(template = %name, path = %path.display(), error = %e, "template unavailable");
                }
            }
        }
        Ok(Self { templates })
    }

    pub fn from_sources<'a>(
        sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, RecapError> {
        let mut templates = HashMap::new();
        for (name, body) in sources {
            let allowed = KNOWN_TEMPLATES
                .iter()
                .find(|(known, _)| *known == name)
                .map(|(_, fields)| *fields)
                .ok_or_else(|| RecapError::Configuration(format!("unknown template {name}")))?;
            templates.insert(name.to_string(), Template::parse(name, body.to_string(), allowed)?);
        }
        Ok(Self { templates })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Fails closed: every token the template references must be bound.
    pub fn render(&self, name: &str, ctx: &ReportContext) -> Result<String, RecapError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| RecapError::TemplateNotFound(name.to_string()))?;

        if let Some(missing) = template.tokens.iter().find(|t| ctx.get(t).is_none()) {
            return Err(RecapError::MissingTemplateField {
                template: name.to_string(),
                field: missing.clone(),
            });
        }

        let html = TOKEN_RE.replace_all(&template.body, |caps: &Captures| {
            ctx.get(&caps[1])
                .map(|v| html_escape::encode_safe(v).into_owned())
                .unwrap_or_default()
        });
        Ok(html.into_owned())
    }
}
