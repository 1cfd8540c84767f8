//! Plausible scalar values guessed from an input's name.
//!
//! Used when memory has nothing relevant to offer, or occasionally on purpose
//! so exploration does not collapse onto previously seen values.

use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;

static RE_POSTAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)postcode|postal|zip").unwrap());
static RE_STREET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)street").unwrap());
static RE_CITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)city|locality").unwrap());
static RE_HOUSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)house").unwrap());
static RE_SURNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)lastname|familyname|surname").unwrap());
static RE_GIVEN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)firstname|forename|givenname").unwrap());
static RE_BIRTHDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)birthdate|dateofbirth").unwrap());
static RE_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)date").unwrap());
static RE_MAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)mail").unwrap());
static RE_PAGING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)limit|top|max|offset|skip").unwrap());

const STREET_NAMES: &[&str] = &[
    "Maple", "Oak", "Cedar", "Pine", "Elm", "Washington", "Lake", "Hill", "Park", "Main",
    "Church", "Mill", "Spring", "Ridge", "Sunset",
];
const STREET_SUFFIXES: &[&str] = &["Street", "Avenue", "Road", "Lane", "Drive", "Court", "Way"];
const CITIES: &[&str] = &[
    "Springfield", "Riverside", "Fairview", "Madison", "Georgetown", "Salem", "Ashland",
    "Clinton", "Franklin", "Milton", "Oxford", "Dover",
];
const SURNAMES: &[&str] = &[
    "Rossi", "Russo", "Ferrari", "Esposito", "Bianchi", "Romano", "Colombo", "Ricci", "Marino",
    "Greco", "Bruno", "Gallo", "Conti", "Costa",
];
const GIVEN_NAMES: &[&str] = &[
    "Oliver", "Emily", "Harry", "Amelia", "George", "Isla", "Jack", "Ava", "Thomas", "Grace",
    "James", "Lily", "William", "Sophie",
];
const MAIL_DOMAINS: &[&str] = &["example.com", "example.org", "mail.test", "inbox.test"];
const WORDS: &[&str] = &[
    "alpha", "bright", "cargo", "delta", "ember", "forest", "garden", "harbor", "island",
    "jolly", "kettle", "lemon", "meadow", "noble", "orbit", "pepper", "quiet", "river",
    "silver", "timber", "umber", "velvet", "winter", "yellow", "zephyr",
];
const HOUSE_LETTERS: &[char] = &['a', 'A', 'b', 'B', 'c', 'C', 'd', 'D', 'e', 'E', 'f', 'F'];

// 1940-01-01 .. 2005-12-31
const BIRTHDAY_RANGE: (i64, i64) = (-946_771_200, 1_136_073_599);
// 1970-01-01 .. 2099-12-31
const DATE_RANGE: (i64, i64) = (0, 4_102_444_799);

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, pool: &[&'a str]) -> &'a str {
    pool.choose(rng).copied().unwrap_or_default()
}

fn timestamp<R: Rng + ?Sized>(rng: &mut R, (from, to): (i64, i64)) -> DateTime<Utc> {
    DateTime::from_timestamp(rng.gen_range(from..=to), 0).unwrap_or_default()
}

/// A string shaped after what the input's name suggests.
pub fn string_for<R: Rng + ?Sized>(rng: &mut R, name: &str) -> String {
    if RE_POSTAL.is_match(name) {
        return format!("{:05}", rng.gen_range(501..=99_950));
    }
    if RE_STREET.is_match(name) {
        return format!(
            "{} {} {}",
            rng.gen_range(1..=9999),
            pick(rng, STREET_NAMES),
            pick(rng, STREET_SUFFIXES)
        );
    }
    if RE_CITY.is_match(name) {
        return pick(rng, CITIES).to_string();
    }
    if RE_HOUSE.is_match(name) {
        return house_number(rng);
    }
    if RE_SURNAME.is_match(name) {
        return pick(rng, SURNAMES).to_string();
    }
    if RE_GIVEN_NAME.is_match(name) {
        return pick(rng, GIVEN_NAMES).to_string();
    }
    if RE_BIRTHDATE.is_match(name) {
        return timestamp(rng, BIRTHDAY_RANGE).format("%Y-%-m-%-d").to_string();
    }
    if RE_DATE.is_match(name) {
        return timestamp(rng, DATE_RANGE).to_rfc3339_opts(SecondsFormat::Millis, true);
    }
    if RE_MAIL.is_match(name) {
        return format!(
            "{}.{}{}@{}",
            pick(rng, WORDS),
            pick(rng, WORDS),
            rng.gen_range(1..100),
            pick(rng, MAIL_DOMAINS)
        );
    }
    sentence(rng)
}

/// One to four digits, sometimes followed by a letter suffix.
fn house_number<R: Rng + ?Sized>(rng: &mut R) -> String {
    let digits = rng.gen_range(1..=4);
    let mut number: String = (0..digits)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();
    if rng.gen_bool(0.5) {
        if rng.gen_bool(0.5) {
            number.push(' ');
        }
        number.push(HOUSE_LETTERS[rng.gen_range(0..HOUSE_LETTERS.len())]);
    }
    number
}

/// A capitalized sentence of one to four words.
fn sentence<R: Rng + ?Sized>(rng: &mut R) -> String {
    let count = rng.gen_range(1..=4);
    let words: Vec<&str> = (0..count).map(|_| pick(rng, WORDS)).collect();
    let mut text = words.join(" ");
    if let Some(first) = text.get(0..1) {
        let upper = first.to_uppercase();
        text.replace_range(0..1, &upper);
    }
    text.push('.');
    text
}

/// An integer; paging-like names get a small non-negative range.
pub fn integer_for<R: Rng + ?Sized>(rng: &mut R, name: &str) -> i64 {
    if RE_PAGING.is_match(name) {
        rng.gen_range(0..=20)
    } else {
        rng.gen_range(-100..=100)
    }
}

pub fn float<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(-100.0..100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn names_select_shapes() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let zip = string_for(&mut rng, "postalCode");
            assert_eq!(zip.len(), 5);
            assert!(zip.chars().all(|c| c.is_ascii_digit()));

            let house = string_for(&mut rng, "houseNumber");
            let digits: String = house.chars().take_while(char::is_ascii_digit).collect();
            assert!((1..=4).contains(&digits.len()), "{house}");

            let birthdate = string_for(&mut rng, "dateOfBirth");
            let parts: Vec<i32> = birthdate.split('-').map(|p| p.parse().unwrap()).collect();
            assert_eq!(parts.len(), 3);
            assert!((1940..=2005).contains(&parts[0]));

            let date = string_for(&mut rng, "createdDate");
            assert!(DateTime::parse_from_rfc3339(&date).is_ok(), "{date}");
            assert!(date.ends_with('Z'));

            assert!(string_for(&mut rng, "email").contains('@'));
            assert!(SURNAMES.contains(&string_for(&mut rng, "lastName").as_str()));
            assert!(GIVEN_NAMES.contains(&string_for(&mut rng, "firstname").as_str()));
            assert!(CITIES.contains(&string_for(&mut rng, "city").as_str()));
        }
    }

    #[test]
    fn fallback_is_a_short_sentence() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let text = string_for(&mut rng, "q");
            assert!(text.ends_with('.'));
            let words = text.trim_end_matches('.').split(' ').count();
            assert!((1..=4).contains(&words));
            assert!(text.chars().next().is_some_and(char::is_uppercase));
        }
    }

    #[test]
    fn paging_integers_are_small() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            assert!((0..=20).contains(&integer_for(&mut rng, "limit")));
            assert!((0..=20).contains(&integer_for(&mut rng, "skip")));
            assert!((-100..=100).contains(&integer_for(&mut rng, "count")));
            assert!((-100.0..100.0).contains(&float(&mut rng)));
        }
    }
}
