//! Naming conventions - table, attribute, foreign key and join table names
//! derived from PascalCase model names

use crate::config::{OrmConfig, TableNaming};

/// Derives every conventional name from one configuration
#[derive(Debug, Clone)]
pub struct NamingConvention {
    foreign_key_suffix: String,
    table_naming: TableNaming,
    join_table_separator: String,
}

impl NamingConvention {
    pub fn new(config: &OrmConfig) -> Self {
        Self {
            foreign_key_suffix: config.foreign_key_suffix.clone(),
            table_naming: config.table_naming,
            join_table_separator: config.join_table_separator.clone(),
        }
    }

    /// Table name for a model (`Artist` -> `artists`)
    pub fn table_name(&self, model_name: &str) -> String {
        let base_name = to_snake_case(model_name);
        match self.table_naming {
            TableNaming::Plural => pluralize(&base_name),
            TableNaming::Singular => base_name,
        }
    }

    /// Attribute name of a singular relationship (`Bio` -> `bio`)
    pub fn singular_attribute(&self, model_name: &str) -> String {
        to_snake_case(model_name)
    }

    /// Attribute name of a plural relationship (`Song` -> `songs`)
    pub fn plural_attribute(&self, model_name: &str) -> String {
        pluralize(&to_snake_case(model_name))
    }

    /// Foreign key field pointing at a model (`Artist` -> `artist_id`)
    pub fn foreign_key(&self, model_name: &str) -> String {
        format!("{}{}", to_snake_case(model_name), self.foreign_key_suffix)
    }

    /// Join table shared by both sides of a many-to-many pair
    pub fn join_table(&self, table1: &str, table2: &str) -> String {
        let mut tables = vec![table1, table2];
        tables.sort();
        tables.join(self.join_table_separator.as_str())
    }

    /// The two join-row key fields, owner side first
    pub fn join_keys(&self, owner_model: &str, related_model: &str) -> (String, String) {
        let local_key = self.foreign_key(owner_model);
        let foreign_key = self.foreign_key(related_model);
        if local_key == foreign_key {
            (local_key, format!("related_{}", foreign_key))
        } else {
            (local_key, foreign_key)
        }
    }
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self::new(&OrmConfig::default())
    }
}

/// Convert PascalCase or camelCase to snake_case
pub fn to_snake_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;

    for ch in name.chars() {
        if ch.is_uppercase() {
            if prev_lower_or_digit {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
            prev_lower_or_digit = false;
        } else {
            prev_lower_or_digit = ch.is_lowercase() || ch.is_ascii_digit();
            result.push(ch);
        }
    }

    result
}

/// Simple pluralization (English-centric)
pub fn pluralize(name: &str) -> String {
    if name.ends_with('y')
        && !name.ends_with("ay")
        && !name.ends_with("ey")
        && !name.ends_with("iy")
        && !name.ends_with("oy")
        && !name.ends_with("uy")
    {
        format!("{}ies", &name[..name.len() - 1])
    } else if name.ends_with('s')
        || name.ends_with("sh")
        || name.ends_with("ch")
        || name.ends_with('x')
        || name.ends_with('z')
    {
        format!("{}es", name)
    } else {
        format!("{}s", name)
    }
}
