//! Randomized form input

use rand::distributions::{Alphanumeric, DistString};
use rand::Rng;

pub const DEFAULT_EMAIL_DOMAIN: &str = "example.com";

fn local_part() -> String {
    let mut rng = rand::thread_rng();
    let letters = Alphanumeric.sample_string(&mut rng, 10).to_lowercase();
    format!("{}{}", letters, rng.gen_range(100..1000))
}

/// A fresh, well-formed address so repeated runs never collide with an
/// earlier RSVP.
pub fn random_email(domain: Option<&str>) -> String {
    format!("{}@{}", local_part(), domain.unwrap_or(DEFAULT_EMAIL_DOMAIN))
}

/// An address a server must refuse: no `@`.
pub fn random_invalid_email(domain: Option<&str>) -> String {
    format!("{}.at.{}", local_part(), domain.unwrap_or(DEFAULT_EMAIL_DOMAIN))
}
