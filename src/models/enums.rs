use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(CertificateCategory {
    Federal => "federal",
    Estadual => "estadual",
    Municipal => "municipal",
    Trabalhista => "trabalhista",
    Judicial => "judicial",
    Outros => "outros",
});

impl CertificateCategory {
    /// Label shown to operators.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Federal => "Federal",
            Self::Estadual => "Estadual",
            Self::Municipal => "Municipal",
            Self::Trabalhista => "Trabalhista",
            Self::Judicial => "Judicial",
            Self::Outros => "Outros",
        }
    }
}

str_enum!(EmissionStatus {
    Pending => "pending",
    Issued => "issued",
    Expired => "expired",
});
