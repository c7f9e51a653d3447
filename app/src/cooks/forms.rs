use serde::Serialize;

use crate::forms::{self, FormData, FormErrors, REQUIRED};

use super::Cook;

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const NAME_MAX_LENGTH: usize = 150;
pub const MIN_EXPERIENCE: i32 = 2;
pub const PASSWORD_MIN_LENGTH: usize = 8;

pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
const TOO_LITTLE_EXPERIENCE: &str = "Cook must have at least 2 years of experience.";
const PASSWORD_MISMATCH: &str = "The two password fields didn’t match.";
const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, \
                                numbers, and @/./+/-/_ characters.";

/// Registration of a new cook. Passwords are never echoed back.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CookCreationForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub years_of_experience: String,
    #[serde(skip)]
    pub password1: String,
    #[serde(skip)]
    pub password2: String,
}

/// A validated registration, ready to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCook {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub years_of_experience: i32,
    pub password: String,
    pub is_staff: bool,
}

/// The only field editable after registration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExperienceForm {
    pub years_of_experience: String,
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || "@.+-_".contains(c)
}

fn check_experience(errors: &mut FormErrors, years: i32) {
    if years < MIN_EXPERIENCE {
        errors.add("years_of_experience", TOO_LITTLE_EXPERIENCE);
    }
}

fn check_password(errors: &mut FormErrors, password: &str, username: &str) {
    if !username.is_empty() && password.to_lowercase() == username.to_lowercase() {
        errors.add("password2", "The password is too similar to the username.");
    }
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        errors.add(
            "password2",
            format!(
                "This password is too short. It must contain at least {} characters.",
                PASSWORD_MIN_LENGTH
            ),
        );
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        errors.add("password2", "This password is entirely numeric.");
    }
}

impl CookCreationForm {
    pub fn from_data(data: &FormData) -> Self {
        CookCreationForm {
            username: data.text("username"),
            first_name: data.text("first_name"),
            last_name: data.text("last_name"),
            years_of_experience: data.text("years_of_experience"),
            password1: data.raw("password1"),
            password2: data.raw("password2"),
        }
    }

    pub fn clean(&self) -> Result<NewCook, FormErrors> {
        let mut errors = FormErrors::default();

        forms::required_text(&mut errors, "username", &self.username, USERNAME_MAX_LENGTH);
        if !self.username.is_empty() && !self.username.chars().all(is_username_char) {
            errors.add("username", INVALID_USERNAME);
        }
        forms::optional_text(&mut errors, "first_name", &self.first_name, NAME_MAX_LENGTH);
        forms::optional_text(&mut errors, "last_name", &self.last_name, NAME_MAX_LENGTH);

        let years = forms::int32(&mut errors, "years_of_experience", &self.years_of_experience);
        match years {
            None if !errors.has("years_of_experience") => {
                errors.add("years_of_experience", REQUIRED);
            }
            None => {}
            Some(years) => {
                if years < 0 {
                    errors.add(
                        "years_of_experience",
                        "Ensure this value is greater than or equal to 0.",
                    );
                }
                check_experience(&mut errors, years);
            }
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if !self.password1.is_empty() && self.password1 != self.password2 {
            errors.add("password2", PASSWORD_MISMATCH);
        } else {
            check_password(&mut errors, &self.password2, &self.username);
        }

        let years = years.unwrap_or_default();
        errors.into_result(|| NewCook {
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            years_of_experience: years,
            password: self.password1.clone(),
            is_staff: false,
        })
    }
}

impl ExperienceForm {
    pub fn from_data(data: &FormData) -> Self {
        ExperienceForm {
            years_of_experience: data.text("years_of_experience"),
        }
    }

    pub fn from_cook(cook: &Cook) -> Self {
        ExperienceForm {
            years_of_experience: cook
                .years_of_experience
                .map(|y| y.to_string())
                .unwrap_or_default(),
        }
    }

    /// Blank clears the value.
    pub fn clean(&self) -> Result<Option<i32>, FormErrors> {
        let mut errors = FormErrors::default();
        let years = forms::int32(&mut errors, "years_of_experience", &self.years_of_experience);
        if let Some(years) = years {
            check_experience(&mut errors, years);
        }
        errors.into_result(|| years)
    }
}
