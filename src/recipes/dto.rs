use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{RecipeFields, RecipeFilter, RecipeRecord};
use crate::{attributes::dto::AttrResponse, error::FieldErrors};

pub const MAX_TEXT_LEN: usize = 255;
/// NUMERIC(5, 2)
const PRICE_MAX_DIGITS: u32 = 5;
const PRICE_DECIMAL_PLACES: u32 = 2;

/// Create / update body. Every field is optional here so that missing fields
/// can be reported alongside invalid ones.
#[derive(Debug, Default, Deserialize)]
pub struct RecipePayload {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<Uuid>>,
}

/// How a payload relates to the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Create,
    /// PUT: title, time and price must be sent again.
    Replace,
    /// PATCH: nothing is required.
    Partial,
}

impl RecipePayload {
    /// Fields for a new recipe.
    pub fn into_new(self) -> Result<RecipeFields, FieldErrors> {
        self.into_fields(Mode::Create, None)
    }

    /// Fields for a full update. Omitted optional fields keep their stored value.
    pub fn into_replacement(self, current: &RecipeRecord) -> Result<RecipeFields, FieldErrors> {
        self.into_fields(Mode::Replace, Some(current))
    }

    /// Fields for a partial update. Omitted fields keep their stored value.
    pub fn into_patch(self, current: &RecipeRecord) -> Result<RecipeFields, FieldErrors> {
        self.into_fields(Mode::Partial, Some(current))
    }

    fn into_fields(
        self,
        mode: Mode,
        current: Option<&RecipeRecord>,
    ) -> Result<RecipeFields, FieldErrors> {
        let mut errors = FieldErrors::new();
        let stored = current.filter(|_| mode == Mode::Partial);

        let title = match (self.title, stored) {
            (Some(t), _) => check_text(&mut errors, "title", t.trim(), false),
            (None, Some(c)) => Some(c.recipe.title.clone()),
            (None, None) => required(&mut errors, "title"),
        };
        let time_minutes = match (self.time_minutes, stored) {
            (Some(m), _) if m < 0 => {
                errors.add("time_minutes", "Ensure this value is greater than or equal to 0.");
                None
            }
            (Some(m), _) => Some(m),
            (None, Some(c)) => Some(c.recipe.time_minutes),
            (None, None) => required(&mut errors, "time_minutes"),
        };
        let price = match (self.price, stored) {
            (Some(p), _) => check_price(&mut errors, p),
            (None, Some(c)) => Some(c.recipe.price),
            (None, None) => required(&mut errors, "price"),
        };
        let link = match (self.link, current) {
            (Some(l), _) => check_text(&mut errors, "link", l.trim(), true),
            (None, Some(c)) => Some(c.recipe.link.clone()),
            (None, None) => Some(String::new()),
        };
        let tag_ids = match (self.tags, current) {
            (Some(ids), _) => dedup(ids),
            (None, Some(c)) => c.tag_ids.clone(),
            (None, None) => Vec::new(),
        };
        let ingredient_ids = match (self.ingredients, current) {
            (Some(ids), _) => dedup(ids),
            (None, Some(c)) => c.ingredient_ids.clone(),
            (None, None) => Vec::new(),
        };

        match (title, time_minutes, price, link) {
            (Some(title), Some(time_minutes), Some(price), Some(link)) if errors.is_empty() => {
                Ok(RecipeFields {
                    title,
                    time_minutes,
                    price,
                    link,
                    tag_ids,
                    ingredient_ids,
                })
            }
            _ => Err(errors),
        }
    }
}

fn required<T>(errors: &mut FieldErrors, field: &str) -> Option<T> {
    errors.add(field, "This field is required.");
    None
}

fn check_text(errors: &mut FieldErrors, field: &str, value: &str, allow_blank: bool) -> Option<String> {
    if value.is_empty() && !allow_blank {
        errors.add(field, "This field may not be blank.");
        return None;
    }
    if value.chars().count() > MAX_TEXT_LEN {
        errors.add(
            field,
            format!("Ensure this field has no more than {MAX_TEXT_LEN} characters."),
        );
        return None;
    }
    Some(value.to_string())
}

/// Enforces NUMERIC(5, 2) and normalizes to two decimal places.
fn check_price(errors: &mut FieldErrors, price: Decimal) -> Option<Decimal> {
    let mut price = price.normalize();
    if price.scale() > PRICE_DECIMAL_PLACES {
        errors.add(
            "price",
            format!("Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."),
        );
        return None;
    }
    let limit = Decimal::from(10u64.pow(PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES));
    if price.abs() >= limit {
        errors.add(
            "price",
            format!("Ensure that there are no more than {PRICE_MAX_DIGITS} digits in total."),
        );
        return None;
    }
    price.rescale(PRICE_DECIMAL_PLACES);
    Some(price)
}

fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// List representation: associations as ids.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeResponse {
    pub id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<Uuid>,
}

impl From<RecipeRecord> for RecipeResponse {
    fn from(r: RecipeRecord) -> Self {
        Self {
            id: r.recipe.id,
            title: r.recipe.title,
            time_minutes: r.recipe.time_minutes,
            price: r.recipe.price,
            link: r.recipe.link,
            tags: r.tag_ids,
            ingredients: r.ingredient_ids,
        }
    }
}

/// Detail representation: associations expanded, image as a URL.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetailResponse {
    pub id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<AttrResponse>,
    pub ingredients: Vec<AttrResponse>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeImageResponse {
    pub id: Uuid,
    pub image: Option<String>,
}

/// `?tags=<id>,<id>&ingredients=<id>`
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

impl RecipeListQuery {
    pub fn into_filter(self) -> Result<RecipeFilter, FieldErrors> {
        let mut errors = FieldErrors::new();
        let tag_ids = parse_ids(&mut errors, "tags", self.tags.as_deref());
        let ingredient_ids = parse_ids(&mut errors, "ingredients", self.ingredients.as_deref());
        if errors.is_empty() {
            Ok(RecipeFilter {
                tag_ids,
                ingredient_ids,
            })
        } else {
            Err(errors)
        }
    }
}

fn parse_ids(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Vec<Uuid> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match Uuid::parse_str(part) {
            Ok(id) => ids.push(id),
            Err(_) => errors.add(field, format!("\"{part}\" is not a valid UUID.")),
        }
    }
    dedup(ids)
}
