//! Work location from the email's country-code TLD

use super::email_domain;
use crate::enricher::{Enricher, EnricherInput, Enrichment, Findings};
use crate::error::EnricherError;
use async_trait::async_trait;

/// Country TLDs sold as generic names, useless for locating anybody
const GENERIC_COUNTRY_TLDS: &[&str] = &[
    "ai", "am", "at", "bz", "cc", "co", "fi", "fm", "im", "in", "io", "is", "it", "ly", "me",
    "mu", "nu", "re", "sk", "sh", "tk", "to", "tv", "ws",
];

/// ccTLD → country name
const COUNTRY_TLDS: &[(&str, &str)] = &[
    ("ad", "Andorra"),
    ("ae", "United Arab Emirates"),
    ("af", "Afghanistan"),
    ("al", "Albania"),
    ("ao", "Angola"),
    ("ar", "Argentina"),
    ("au", "Australia"),
    ("az", "Azerbaijan"),
    ("ba", "Bosnia and Herzegovina"),
    ("bd", "Bangladesh"),
    ("be", "Belgium"),
    ("bf", "Burkina Faso"),
    ("bg", "Bulgaria"),
    ("bh", "Bahrain"),
    ("bj", "Benin"),
    ("bo", "Bolivia"),
    ("br", "Brazil"),
    ("bw", "Botswana"),
    ("by", "Belarus"),
    ("ca", "Canada"),
    ("cd", "Democratic Republic of the Congo"),
    ("cg", "Congo"),
    ("ch", "Switzerland"),
    ("ci", "Côte d'Ivoire"),
    ("cl", "Chile"),
    ("cm", "Cameroon"),
    ("cn", "China"),
    ("cr", "Costa Rica"),
    ("cu", "Cuba"),
    ("cy", "Cyprus"),
    ("cz", "Czechia"),
    ("de", "Germany"),
    ("dk", "Denmark"),
    ("do", "Dominican Republic"),
    ("dz", "Algeria"),
    ("ec", "Ecuador"),
    ("ee", "Estonia"),
    ("eg", "Egypt"),
    ("es", "Spain"),
    ("et", "Ethiopia"),
    ("fr", "France"),
    ("ga", "Gabon"),
    ("gb", "United Kingdom"),
    ("ge", "Georgia"),
    ("gh", "Ghana"),
    ("gn", "Guinea"),
    ("gr", "Greece"),
    ("gt", "Guatemala"),
    ("hk", "Hong Kong"),
    ("hn", "Honduras"),
    ("hr", "Croatia"),
    ("ht", "Haiti"),
    ("hu", "Hungary"),
    ("id", "Indonesia"),
    ("ie", "Ireland"),
    ("il", "Israel"),
    ("iq", "Iraq"),
    ("ir", "Iran"),
    ("jm", "Jamaica"),
    ("jo", "Jordan"),
    ("jp", "Japan"),
    ("ke", "Kenya"),
    ("kg", "Kyrgyzstan"),
    ("kh", "Cambodia"),
    ("kr", "South Korea"),
    ("kw", "Kuwait"),
    ("kz", "Kazakhstan"),
    ("lb", "Lebanon"),
    ("li", "Liechtenstein"),
    ("lk", "Sri Lanka"),
    ("lt", "Lithuania"),
    ("lu", "Luxembourg"),
    ("lv", "Latvia"),
    ("ma", "Morocco"),
    ("mc", "Monaco"),
    ("md", "Moldova"),
    ("mg", "Madagascar"),
    ("mk", "North Macedonia"),
    ("ml", "Mali"),
    ("mn", "Mongolia"),
    ("mr", "Mauritania"),
    ("mt", "Malta"),
    ("mx", "Mexico"),
    ("my", "Malaysia"),
    ("mz", "Mozambique"),
    ("na", "Namibia"),
    ("ne", "Niger"),
    ("ng", "Nigeria"),
    ("ni", "Nicaragua"),
    ("nl", "Netherlands"),
    ("no", "Norway"),
    ("np", "Nepal"),
    ("nz", "New Zealand"),
    ("om", "Oman"),
    ("pa", "Panama"),
    ("pe", "Peru"),
    ("ph", "Philippines"),
    ("pk", "Pakistan"),
    ("pl", "Poland"),
    ("pt", "Portugal"),
    ("py", "Paraguay"),
    ("qa", "Qatar"),
    ("ro", "Romania"),
    ("rs", "Serbia"),
    ("ru", "Russia"),
    ("rw", "Rwanda"),
    ("sa", "Saudi Arabia"),
    ("se", "Sweden"),
    ("sg", "Singapore"),
    ("si", "Slovenia"),
    ("sn", "Senegal"),
    ("sv", "El Salvador"),
    ("sy", "Syria"),
    ("td", "Chad"),
    ("tg", "Togo"),
    ("th", "Thailand"),
    ("tn", "Tunisia"),
    ("tr", "Türkiye"),
    ("tw", "Taiwan"),
    ("tz", "Tanzania"),
    ("ua", "Ukraine"),
    ("ug", "Uganda"),
    ("uk", "United Kingdom"),
    ("us", "United States"),
    ("uy", "Uruguay"),
    ("uz", "Uzbekistan"),
    ("ve", "Venezuela"),
    ("vn", "Vietnam"),
    ("za", "South Africa"),
    ("zm", "Zambia"),
    ("zw", "Zimbabwe"),
];

/// Country suggested by a domain's TLD, if it is a geographic one
pub fn guess_country(domain: &str) -> Option<&'static str> {
    let tld = domain.rsplit('.').next()?.to_ascii_lowercase();
    if GENERIC_COUNTRY_TLDS.contains(&tld.as_str()) {
        return None;
    }
    COUNTRY_TLDS
        .iter()
        .find(|(code, _)| *code == tld)
        .map(|(_, country)| *country)
}

/// Adds `workLocation` from the email domain's country TLD
#[derive(Debug, Default, Clone, Copy)]
pub struct CountryFromDomain;

impl CountryFromDomain {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Enricher for CountryFromDomain {
    fn name(&self) -> &str {
        "country-from-domain"
    }

    async fn enrich(&self, input: EnricherInput) -> Result<Enrichment, EnricherError> {
        let country = input
            .text("email")
            .and_then(email_domain)
            .and_then(|domain| guess_country(&domain));

        Ok(match country {
            Some(country) => Enrichment::found(Findings::new().with("workLocation", country)),
            None => Enrichment::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_country() {
        assert_eq!(guess_country("ankaboot.fr"), Some("France"));
        assert_eq!(guess_country("mail.example.co.uk"), Some("United Kingdom"));
        assert_eq!(guess_country("startup.io"), None);
        assert_eq!(guess_country("example.com"), None);
    }

    #[tokio::test]
    async fn test_enricher() {
        let enricher = CountryFromDomain::new();
        let found = enricher
            .enrich(EnricherInput::from_pairs([("email", "hans@firma.DE")]))
            .await
            .unwrap();
        assert_eq!(
            found,
            Enrichment::Found(Findings::new().with("workLocation", "Germany"))
        );

        let missing = enricher.enrich(EnricherInput::default()).await.unwrap();
        assert_eq!(missing, Enrichment::NotFound);
    }
}
