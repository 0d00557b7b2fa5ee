//! Code for handling the labels which identify rows and columns of tables.
//!
//! All labels are normalised on creation (trimmed and lower-cased) so that tables read from
//! different source files can be joined consistently.

/// Normalise a raw label by trimming whitespace and converting it to lower case
pub fn normalise_label(raw: &str) -> String {
    raw.trim().to_lowercase()
}

macro_rules! define_label_type {
    ($name:ident) => {
        #[derive(
            Clone,
            std::hash::Hash,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Debug,
            serde::Serialize,
        )]
        /// A normalised label type (e.g. for sectors, flows or impact categories)
        pub struct $name(std::sync::Arc<str>);

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name::new(&s)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Ok($name::new(&raw))
            }
        }

        impl $name {
            /// Create a new label from a string slice, normalising it
            pub fn new(label: &str) -> Self {
                $name(std::sync::Arc::from($crate::id::normalise_label(label)))
            }

            /// The normalised label as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}
define_label_type!(Label);
