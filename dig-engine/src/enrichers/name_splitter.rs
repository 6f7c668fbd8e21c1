//! Full name splitter
//!
//! Splits a display name into given and family name using a handful of
//! writing conventions:
//! - `Family, Given`
//! - `FAMILY Given` / `Given FAMILY` (upper-case word marks the family name)
//! - particles opening a family name (`van`, `de`, `bin`, ...)
//! - honorifics (`Dr`, `Prof`, ...) which become a job title
//!
//! Role mailboxes (`contact`, `support`, ...), civilities and names equal to
//! the company behind the email domain are rejected.

use crate::enricher::{Enricher, EnricherInput, Enrichment, Findings};
use crate::error::EnricherError;
use async_trait::async_trait;

/// Particles that start a family name
const FAMILY_NAME_PARTICLES: &[&str] = &[
    "إبن", "بن", "a", "ab", "af", "ap", "abu", "aït", "al", "ālam", "at", "ath", "aust", "bar",
    "bath", "ben", "bin", "bint", "d'", "da", "de", "degli", "del", "dele", "della", "der", "di",
    "dos", "du", "e", "el", "ferch", "fitz", "i", "ibn", "ka", "kil", "la", "le", "lil", "lille",
    "lu", "m'", "mac", "mc", "mck", "mhic", "mic", "mala", "mellom", "na", "ned", "neder", "ngā",
    "nic", "nin", "nord", "ny", "o", "o'", "opp", "ost", "över", "øvste", "ó", "öz", "pour", "'s",
    "setia", "setya", "stor", "söder", "'t", "te", "ter", "tre", "ua", "ui", "van", "väst",
    "verch", "vest", "vesle", "von", "war", "zu",
];

const CIVILITIES: &[&str] = &["m", "mme", "mlle", "mr", "mrs", "ms"];

const ROLE_NAMES: &[&str] = &[
    "contact",
    "communication",
    "events",
    "forum",
    "meeting",
    "secretariat",
    "secretario",
    "service",
    "service client",
    "support",
    "wordpress",
];

/// Honorific abbreviations, kept as written
const HONORIFICS: &[&str] = &["Dr", "Ing", "Eng", "Engr", "PhD", "Pr", "Prof"];

/// Leading words joining a company name to its domain ("from Acme")
const BUSINESS_PREFIXES: &[&str] = &["from", "van", "von", "de", "d"];

/// Result of splitting a full name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitName {
    pub given_name: String,
    pub family_name: Option<String>,
    pub job_title: Option<String>,
}

/// Split `full_name`, optionally checked against the email domain
///
/// Returns `None` when no plausible given name is found.
pub fn split_full_name(full_name: &str, domain: Option<&str>) -> Option<SplitName> {
    let full_name = full_name.split_whitespace().collect::<Vec<_>>().join(" ");
    if !looks_like_name(&full_name) || is_role_or_civility(&full_name) {
        return None;
    }
    if domain.is_some_and(|d| is_company(&full_name, d)) {
        return None;
    }

    let mut parts = split_parts(&full_name)?;

    let keep = |value: &str| {
        looks_like_name(value)
            && !is_role_or_civility(value)
            && !domain.is_some_and(|d| is_company(value, d))
    };

    parts.family_name = parts.family_name.filter(|v| keep(v));
    if !keep(&parts.given_name) {
        return None;
    }
    Some(parts)
}

fn split_parts(full_name: &str) -> Option<SplitName> {
    if let Some((family, given)) = split_comma_form(full_name) {
        return Some(SplitName {
            given_name: given,
            family_name: Some(family),
            job_title: None,
        });
    }

    let mut words: Vec<&str> = full_name.split(' ').collect();
    let mut job_title = None;

    if words.len() > 1 {
        if let Some(title) = honorific(words[0]) {
            job_title = Some(title.to_string());
            words.remove(0);
        } else if is_civility(words[0]) {
            words.remove(0);
        }
    }
    if words.len() > 2 {
        if let Some(title) = words.last().and_then(|w| honorific(w)) {
            job_title.get_or_insert_with(|| title.to_string());
            words.pop();
        }
    }

    let (given_name, family_name) = match words.as_slice() {
        [] => return None,
        [single] => (single.to_string(), None),
        [first, second] => {
            let (given, family) = order(first, second);
            (given.to_string(), Some(family.to_string()))
        }
        _ => split_many(&words),
    };

    Some(SplitName {
        given_name,
        family_name,
        job_title,
    })
}

/// `Family, Given`, only when the family part is capitalized
fn split_comma_form(full_name: &str) -> Option<(String, String)> {
    let (family, given) = full_name.split_once(',')?;
    if given.contains(',') {
        return None;
    }
    let family = family.trim();
    let given = given.trim();
    let capitalized = family.chars().next().is_some_and(char::is_uppercase);
    if capitalized && !family.is_empty() && !given.is_empty() {
        Some((family.to_string(), given.to_string()))
    } else {
        None
    }
}

/// Given/family of a two-word name; an upper-case first word is the family name
fn order<'w>(first: &'w str, second: &'w str) -> (&'w str, &'w str) {
    if is_upper(first) && !is_upper(second) {
        (second, first)
    } else {
        (first, second)
    }
}

fn split_many(words: &[&str]) -> (String, Option<String>) {
    let first_upper = is_upper(words[0]);
    let last_upper = words.last().is_some_and(|w| is_upper(w));

    if first_upper != last_upper {
        // upper-case words form the family name, whichever end they sit at
        let boundary = if last_upper {
            words.iter().position(|w| is_upper(w))
        } else {
            words.iter().position(|w| !is_upper(w))
        }
        .unwrap_or(words.len());

        let head = words[..boundary].join(" ");
        let tail = words[boundary..].join(" ");
        let (given, family) = if first_upper { (tail, head) } else { (head, tail) };
        return (given, Some(family).filter(|f| !f.is_empty()));
    }

    let particle = (1..words.len() - 1)
        .find(|&i| FAMILY_NAME_PARTICLES.contains(&words[i].to_lowercase().as_str()));

    match particle {
        Some(i) => (words[..i].join(" "), Some(words[i..].join(" "))),
        None => (words[0].to_string(), None),
    }
}

fn honorific(word: &str) -> Option<&'static str> {
    let chars = word.chars().count();
    if !(2..=5).contains(&chars) {
        return None;
    }
    let bare = word.strip_suffix('.').unwrap_or(word);
    HONORIFICS
        .iter()
        .copied()
        .find(|h| h.eq_ignore_ascii_case(bare))
}

fn is_civility(word: &str) -> bool {
    let bare = word.strip_suffix('.').unwrap_or(word).to_lowercase();
    CIVILITIES.contains(&bare.as_str())
}

fn is_role_or_civility(value: &str) -> bool {
    let lower = value.to_lowercase();
    ROLE_NAMES.contains(&lower.as_str()) || is_civility(&lower)
}

/// At least one cased character and no lower-case one
fn is_upper(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && !word.chars().any(char::is_lowercase)
}

/// Starts like a word and carries at least two letters
fn looks_like_name(value: &str) -> bool {
    value.chars().next().is_some_and(char::is_alphanumeric)
        && value.chars().filter(|c| c.is_alphabetic()).count() >= 2
}

/// Whether `name` denotes the organization behind `domain`
pub fn is_company(name: &str, domain: &str) -> bool {
    let domain = domain.trim().to_lowercase();
    let labels: Vec<&str> = domain.split('.').filter(|l| !l.is_empty()).collect();
    let Some(&label) = labels.len().checked_sub(2).and_then(|i| labels.get(i)).or(labels.first())
    else {
        return false;
    };
    let registrable = labels[labels.len().saturating_sub(2)..].join(".");

    let mut words: Vec<&str> = name.split_whitespace().collect();
    if words.len() > 1
        && BUSINESS_PREFIXES
            .iter()
            .any(|p| p.eq_ignore_ascii_case(words[0]))
    {
        words.remove(0);
    }
    let Some(first) = words.first() else {
        return false;
    };

    let joined = compact(&words.concat());
    joined == label || joined == domain || joined == registrable || compact(first) == label
}

fn compact(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '-')
        .collect::<String>()
        .to_lowercase()
}

/// Splits `name` into `givenName` / `familyName`, honorifics into `jobTitle`
#[derive(Debug, Default, Clone, Copy)]
pub struct NameSplitter;

impl NameSplitter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Enricher for NameSplitter {
    fn name(&self) -> &str {
        "name-splitter"
    }

    async fn enrich(&self, input: EnricherInput) -> Result<Enrichment, EnricherError> {
        let Some(full_name) = input.text("name") else {
            return Ok(Enrichment::NotFound);
        };
        let domain = input
            .text("email")
            .and_then(|email| email.rsplit_once('@'))
            .map(|(_, domain)| domain);

        let Some(split) = split_full_name(full_name, domain) else {
            return Ok(Enrichment::NotFound);
        };

        let mut findings = Findings::new().with("givenName", split.given_name);
        if let Some(family) = split.family_name {
            findings.insert("familyName", family);
        }
        if let Some(title) = split.job_title {
            findings.insert("jobTitle", title);
        }
        Ok(Enrichment::found(findings))
    }
}
