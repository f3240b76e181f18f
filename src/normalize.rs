//! Normalization at the boundary between upstream payloads and snapshots.
//!
//! Everything past this module works on [`Record`]s, so field-presence
//! checks live here and nowhere else.

use crate::types::{AnimalId, Record};
use serde_json::Value;

/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_text(text: Option<&str>) -> String {
    text.unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn field_str(obj: &Value, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// Human location label derived from the foster flag and kennel number.
pub fn location_label(foster: bool, kennel_number: Option<&str>) -> String {
    match kennel_number.filter(|k| !k.is_empty()) {
        _ if foster => "Foster".to_string(),
        Some(kennel) => format!("Kennel {kennel}"),
        None => "Unspecified".to_string(),
    }
}

/// Trait keys and names from a detail payload's characteristic list.
fn characteristics(detail_pet: &Value) -> (Vec<String>, Vec<String>) {
    let mut keys = Vec::new();
    let mut names = Vec::new();

    let entries = detail_pet
        .get("_extends")
        .and_then(|ext| ext.get("pet_characteristics"))
        .and_then(Value::as_array);

    for entry in entries.into_iter().flatten() {
        let characteristic = entry
            .get("public_characteristic")
            .or_else(|| entry.get("characteristic"))
            .filter(|c| c.is_object());
        let Some(characteristic) = characteristic else {
            continue;
        };

        if let Some(key) = field_str(characteristic, "key").filter(|k| !k.is_empty()) {
            keys.push(key);
        }
        if let Some(name) = field_str(characteristic, "name").filter(|n| !n.is_empty()) {
            names.push(name);
        }
    }

    (keys, names)
}

/// Map one upstream listing item plus its detail payload to a [`Record`].
///
/// `list_item` is the search result entry (holding `organization_pet`);
/// `detail` is the detail endpoint's `data` object. Returns `None` when
/// the listing carries no usable animal code.
pub fn normalize_listing(list_item: &Value, detail: &Value) -> Option<Record> {
    let pet = list_item.get("organization_pet")?;
    let detail_pet = detail.get("organization_pet").unwrap_or(&Value::Null);

    let animal_id = AnimalId::parse(&field_str(pet, "code")?)?;
    let foster = is_truthy(pet.get("foster"));
    let kennel_number = field_str(pet, "kennel_number");
    let (characteristic_keys, characteristic_names) = characteristics(detail_pet);

    let description_html = field_str(detail_pet, "description")
        .filter(|d| !d.is_empty())
        .or_else(|| field_str(pet, "description"));

    Some(Record {
        uuid: field_str(pet, "uuid"),
        animal_id,
        name: field_str(pet, "name"),
        species: field_str(pet, "specie_name"),
        sex: field_str(pet, "sex_key"),
        age_key: field_str(pet, "age_key"),
        size_key: field_str(pet, "size_key"),
        breed_primary_name: field_str(pet, "breed_primary_name"),
        status: field_str(pet, "status_key"),
        foster,
        location: Some(location_label(foster, kennel_number.as_deref())),
        kennel_number,
        picture: field_str(pet, "picture"),
        description_html,
        characteristic_keys,
        characteristic_names,
    })
}
