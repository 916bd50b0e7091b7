//! Realistic text backed by the `fake` crate.
//!
//! The field name picks the kind of value: `email`, `first_name`, `city` and so on. Names with
//! no recognised hint fall back to a lorem word.

use std::fmt;

use fake::Fake;
use rand_chacha::ChaCha8Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Locale {
    EnUs,
    PtBr,
}

impl Locale {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "en_us" | "en" => Some(Self::EnUs),
            "pt_br" => Some(Self::PtBr),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en_us",
            Self::PtBr => "pt_br",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of realistic value inferred from a field name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SemanticKind {
    Email,
    FirstName,
    LastName,
    FullName,
    Username,
    Phone,
    City,
    Street,
    Country,
    PostalCode,
    Company,
    JobTitle,
    Word,
}

impl SemanticKind {
    pub fn for_field(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        let has = |hint: &str| name.contains(hint);
        if has("email") {
            Self::Email
        } else if has("first_name") || has("firstname") || has("given_name") {
            Self::FirstName
        } else if has("last_name") || has("lastname") || has("surname") {
            Self::LastName
        } else if has("username") || has("login") || has("handle") {
            Self::Username
        } else if has("phone") || has("mobile") {
            Self::Phone
        } else if has("city") {
            Self::City
        } else if has("street") || has("address") {
            Self::Street
        } else if has("country") {
            Self::Country
        } else if has("zip") || has("postal") || has("cep") {
            Self::PostalCode
        } else if has("company") || has("employer") || has("organization") {
            Self::Company
        } else if has("job") || has("title") || has("position") {
            Self::JobTitle
        } else if has("name") {
            Self::FullName
        } else {
            Self::Word
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::FullName => "full_name",
            Self::Username => "username",
            Self::Phone => "phone",
            Self::City => "city",
            Self::Street => "street",
            Self::Country => "country",
            Self::PostalCode => "postal_code",
            Self::Company => "company",
            Self::JobTitle => "job_title",
            Self::Word => "word",
        }
    }
}

macro_rules! localized {
    ($locale:expr, $rng:expr, $module:ident :: $faker:ident) => {
        match $locale {
            Locale::EnUs => fake::faker::$module::en::$faker().fake_with_rng::<String, _>($rng),
            Locale::PtBr => fake::faker::$module::pt_br::$faker().fake_with_rng::<String, _>($rng),
        }
    };
}

pub fn semantic_text(kind: SemanticKind, locale: Locale, rng: &mut ChaCha8Rng) -> String {
    match kind {
        SemanticKind::Email => localized!(locale, rng, internet::SafeEmail),
        SemanticKind::FirstName => localized!(locale, rng, name::FirstName),
        SemanticKind::LastName => localized!(locale, rng, name::LastName),
        SemanticKind::FullName => localized!(locale, rng, name::Name),
        SemanticKind::Username => localized!(locale, rng, internet::Username),
        SemanticKind::Phone => localized!(locale, rng, phone_number::PhoneNumber),
        SemanticKind::City => localized!(locale, rng, address::CityName),
        SemanticKind::Street => localized!(locale, rng, address::StreetName),
        SemanticKind::Country => localized!(locale, rng, address::CountryName),
        SemanticKind::PostalCode => localized!(locale, rng, address::ZipCode),
        SemanticKind::Company => localized!(locale, rng, company::CompanyName),
        SemanticKind::JobTitle => localized!(locale, rng, job::Title),
        SemanticKind::Word => localized!(locale, rng, lorem::Word),
    }
}
