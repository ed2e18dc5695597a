//! Parsing of `#[entity(...)]` and `#[soft_delete]` attributes

use syn::{Attribute, Data, DeriveInput, Error, Fields, Ident, LitStr, Result};

#[derive(Debug)]
pub struct EntityInfo {
    pub model: String,
    pub soft_delete_field: Option<String>,
}

pub fn parse_entity(input: &DeriveInput) -> Result<EntityInfo> {
    let mut model = None;
    let mut soft_delete_field = None;

    for attr in entity_attributes(&input.attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("model") {
                let value: LitStr = meta.value()?.parse()?;
                validate_model_name(&value.value(), value.span())?;
                model = Some(value.value());
                Ok(())
            } else if meta.path.is_ident("soft_delete") {
                let value: LitStr = meta.value()?.parse()?;
                validate_field_name(&value.value(), value.span())?;
                soft_delete_field = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported entity attribute, expected `model` or `soft_delete`"))
            }
        })?;
    }

    if let Some(field) = marked_soft_delete_field(&input.data)? {
        if soft_delete_field.is_some() {
            return Err(Error::new_spanned(
                &field,
                "soft delete field given twice: remove either #[soft_delete] or `soft_delete = \"...\"`",
            ));
        }
        soft_delete_field = Some(unraw(&field));
    }

    Ok(EntityInfo {
        model: model.unwrap_or_else(|| to_snake_case(&unraw(&input.ident))),
        soft_delete_field,
    })
}

fn entity_attributes(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|attr| attr.path().is_ident("entity"))
}

/// The single field carrying `#[soft_delete]`, if any
fn marked_soft_delete_field(data: &Data) -> Result<Option<Ident>> {
    let Data::Struct(data) = data else {
        return Ok(None);
    };
    let Fields::Named(fields) = &data.fields else {
        return Ok(None);
    };

    let mut marked: Option<Ident> = None;
    for field in &fields.named {
        if !field.attrs.iter().any(|attr| attr.path().is_ident("soft_delete")) {
            continue;
        }
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        if marked.is_some() {
            return Err(Error::new_spanned(&ident, "only one field can be #[soft_delete]"));
        }
        marked = Some(ident);
    }
    Ok(marked)
}

fn unraw(ident: &Ident) -> String {
    let name = ident.to_string();
    name.strip_prefix("r#").map(str::to_string).unwrap_or(name)
}

/// `CatalogProduct` -> `catalog_product`, `HTTPLog` -> `http_log`
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut snake = String::with_capacity(name.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let after_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let before_lower = i > 0
                && chars[i - 1].is_uppercase()
                && chars.get(i + 1).is_some_and(|next| next.is_lowercase());
            if after_lower || before_lower {
                snake.push('_');
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(*c);
        }
    }
    snake
}

fn validate_model_name(name: &str, span: proc_macro2::Span) -> Result<()> {
    validate_identifier(name)
        .map_err(|e| Error::new(span, format!("Invalid model name '{}': {}", name, e)))
}

fn validate_field_name(name: &str, span: proc_macro2::Span) -> Result<()> {
    validate_identifier(name)
        .map_err(|e| Error::new(span, format!("Invalid soft delete field '{}': {}", name, e)))
}

/// Same rules the Postgres adapter applies at runtime
fn validate_identifier(name: &str) -> std::result::Result<(), String> {
    let first_char = name
        .chars()
        .next()
        .ok_or_else(|| "Name cannot be empty".to_string())?;

    if name.len() > 63 {
        return Err(format!("{} characters (max 63)", name.len()));
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err("must start with a letter or underscore".to_string());
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(
            "only alphanumeric characters and underscores are allowed".to_string(),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_snake_case_model_names() {
        assert_eq!(to_snake_case("Product"), "product");
        assert_eq!(to_snake_case("CatalogProduct"), "catalog_product");
        assert_eq!(to_snake_case("HTTPLog"), "http_log");
        assert_eq!(to_snake_case("Order2Item"), "order2_item");
    }

    #[test]
    fn test_parse_explicit_attributes() {
        let input: DeriveInput = parse_quote! {
            #[entity(model = "products", soft_delete = "removed_at")]
            struct Product { id: i64 }
        };
        let info = parse_entity(&input).unwrap();

        assert_eq!(info.model, "products");
        assert_eq!(info.soft_delete_field.as_deref(), Some("removed_at"));
    }

    #[test]
    fn test_parse_defaults_and_field_marker() {
        let input: DeriveInput = parse_quote! {
            struct CatalogProduct {
                id: i64,
                #[soft_delete]
                archived_at: Option<String>,
            }
        };
        let info = parse_entity(&input).unwrap();

        assert_eq!(info.model, "catalog_product");
        assert_eq!(info.soft_delete_field.as_deref(), Some("archived_at"));
    }

    #[test]
    fn test_rejects_bad_input() {
        let unknown: DeriveInput = parse_quote! {
            #[entity(table = "products")]
            struct Product { id: i64 }
        };
        assert!(parse_entity(&unknown).is_err());

        let invalid: DeriveInput = parse_quote! {
            #[entity(model = "products; drop")]
            struct Product { id: i64 }
        };
        assert!(parse_entity(&invalid).is_err());

        let twice: DeriveInput = parse_quote! {
            #[entity(soft_delete = "deleted_at")]
            struct Product {
                #[soft_delete]
                archived_at: Option<String>,
            }
        };
        assert!(parse_entity(&twice).is_err());
    }
}
