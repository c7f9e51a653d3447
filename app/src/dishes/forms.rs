use rust_decimal::Decimal;
use serde::Serialize;

use infra::ids::Id;

use crate::cooks::Cook;
use crate::dish_types::DishType;
use crate::forms::{self, Choice, FormData, FormErrors, SelectOption};
use crate::ingredients::Ingredient;

use super::{DishDetail, DECIMAL_PLACES, MAX_DIGITS};

pub const NAME_MAX_LENGTH: usize = 255;

/// The dish form as submitted, kept verbatim for re-rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DishForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub dish_type: String,
    pub cooks: Vec<String>,
    pub ingredients: Vec<String>,
}

/// Everything the form's selects may offer.
#[derive(Debug, Clone, Default)]
pub struct DishChoices {
    pub dish_types: Vec<Choice<DishType>>,
    pub cooks: Vec<Choice<Cook>>,
    pub ingredients: Vec<Choice<Ingredient>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DishOptions {
    pub dish_types: Vec<SelectOption>,
    pub cooks: Vec<SelectOption>,
    pub ingredients: Vec<SelectOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DishInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub dish_type: Id<DishType>,
    pub cooks: Vec<Id<Cook>>,
    pub ingredients: Vec<Id<Ingredient>>,
}

impl DishForm {
    pub fn from_data(data: &FormData) -> Self {
        let all = |name: &str| {
            data.get_all(name)
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        DishForm {
            name: data.text("name"),
            description: data.text("description"),
            price: data.text("price"),
            dish_type: data.text("dish_type"),
            cooks: all("cooks"),
            ingredients: all("ingredients"),
        }
    }

    pub fn from_detail(detail: &DishDetail) -> Self {
        DishForm {
            name: detail.dish.name.clone(),
            description: detail.dish.description.clone(),
            price: detail.dish.price.to_string(),
            dish_type: detail.dish.dish_type.id.to_string(),
            cooks: detail.cooks.iter().map(|c| c.id.to_string()).collect(),
            ingredients: detail.ingredients.iter().map(|i| i.id.to_string()).collect(),
        }
    }

    pub fn clean(&self, choices: &DishChoices) -> Result<DishInput, FormErrors> {
        let mut errors = FormErrors::default();

        forms::required_text(&mut errors, "name", &self.name, NAME_MAX_LENGTH);
        if self.description.is_empty() {
            errors.add("description", forms::REQUIRED);
        }
        let price = forms::decimal(&mut errors, "price", &self.price, MAX_DIGITS, DECIMAL_PLACES);
        let dish_type = forms::choice(&mut errors, "dish_type", &self.dish_type, &choices.dish_types);
        let cooks = forms::multiple_choice(&mut errors, "cooks", &self.cooks, &choices.cooks, true);
        let ingredients = forms::multiple_choice(
            &mut errors,
            "ingredients",
            &self.ingredients,
            &choices.ingredients,
            false,
        );

        match (price, dish_type) {
            (Some(price), Some(dish_type)) if errors.is_empty() => Ok(DishInput {
                name: self.name.clone(),
                description: self.description.clone(),
                price,
                dish_type,
                cooks,
                ingredients,
            }),
            _ => Err(errors),
        }
    }
}

impl DishChoices {
    /// Select options with the form's current values marked.
    pub fn options(&self, form: &DishForm) -> DishOptions {
        DishOptions {
            dish_types: forms::options(&self.dish_types, &[form.dish_type.clone()]),
            cooks: forms::options(&self.cooks, &form.cooks),
            ingredients: forms::options(&self.ingredients, &form.ingredients),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn choices() -> DishChoices {
        DishChoices {
            dish_types: vec![Choice {
                id: Id::new(1),
                label: "Soup".into(),
            }],
            cooks: vec![
                Choice {
                    id: Id::new(1),
                    label: "chef (5 years of experience)".into(),
                },
                Choice {
                    id: Id::new(2),
                    label: "sous (3 years of experience)".into(),
                },
            ],
            ingredients: vec![Choice {
                id: Id::new(9),
                label: "Beetroot".into(),
            }],
        }
    }

    fn submission() -> FormData {
        FormData::from_pairs(vec![
            ("name", "Borscht"),
            ("description", "Beetroot soup"),
            ("price", "12.50"),
            ("dish_type", "1"),
            ("cooks", "1"),
            ("cooks", "2"),
            ("ingredients", "9"),
        ])
    }

    #[test]
    fn accepts_valid_submission() {
        let input = DishForm::from_data(&submission())
            .clean(&choices())
            .expect("valid");
        assert_eq!(input.name, "Borscht");
        assert_eq!(input.price, Decimal::new(1250, 2));
        assert_eq!(input.dish_type, Id::new(1));
        assert_eq!(input.cooks, vec![Id::new(1), Id::new(2)]);
        assert_eq!(input.ingredients, vec![Id::new(9)]);
    }

    #[test]
    fn requires_at_least_one_cook() {
        let mut form = DishForm::from_data(&submission());
        form.cooks.clear();
        let errors = form.clean(&choices()).expect_err("no cooks");
        assert_eq!(errors.field("cooks"), &[forms::REQUIRED.to_string()]);
    }

    #[test]
    fn ingredients_are_optional() {
        let mut form = DishForm::from_data(&submission());
        form.ingredients.clear();
        let input = form.clean(&choices()).expect("valid");
        assert!(input.ingredients.is_empty());
    }

    #[test]
    fn rejects_unknown_cook() {
        let mut form = DishForm::from_data(&submission());
        form.cooks.push("42".into());
        let errors = form.clean(&choices()).expect_err("unknown cook");
        assert_eq!(
            errors.field("cooks"),
            &["Select a valid choice. 42 is not one of the available choices.".to_string()]
        );
    }

    #[test]
    fn rejects_unknown_dish_type() {
        let mut form = DishForm::from_data(&submission());
        form.dish_type = "7".into();
        let errors = form.clean(&choices()).expect_err("unknown type");
        assert_eq!(errors.field("dish_type"), &[forms::INVALID_CHOICE.to_string()]);
    }

    #[test]
    fn rejects_overly_precise_price() {
        let mut form = DishForm::from_data(&submission());
        form.price = "12.505".into();
        let errors = form.clean(&choices()).expect_err("precision");
        assert_eq!(
            errors.field("price"),
            &["Ensure that there are no more than 2 decimal places.".to_string()]
        );
    }

    #[test]
    fn rejects_missing_text_fields() {
        let mut form = DishForm::from_data(&submission());
        form.name.clear();
        form.description.clear();
        let errors = form.clean(&choices()).expect_err("blank");
        assert!(errors.has("name"));
        assert!(errors.has("description"));
    }

    #[test]
    fn options_reflect_submission() {
        let form = DishForm::from_data(&submission());
        let options = choices().options(&form);
        assert!(options.dish_types[0].selected);
        assert!(options.cooks.iter().all(|o| o.selected));
        assert!(options.ingredients[0].selected);
    }
}
