use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::MlErr;

/// The optimization algorithm a network is trained with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Method {
    Sgd,
    #[default]
    Adam,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sgd => "sgd",
            Self::Adam => "adam",
        }
    }
}

impl FromStr for Method {
    type Err = MlErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sgd" => Ok(Self::Sgd),
            "adam" => Ok(Self::Adam),
            other => Err(MlErr::invalid(format!(
                "unknown optimization method '{other}', expected sgd or adam"
            ))),
        }
    }
}

impl TryFrom<String> for Method {
    type Error = MlErr;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Method> for String {
    fn from(value: Method) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_exact_names_parse() {
        assert_eq!("sgd".parse::<Method>().unwrap(), Method::Sgd);
        assert_eq!("adam".parse::<Method>().unwrap(), Method::Adam);

        for bad in ["Adam", "SGD", "rmsprop", ""] {
            assert!(matches!(
                bad.parse::<Method>(),
                Err(MlErr::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn serde_round_trips_the_name() {
        let method: Method = serde_json::from_str("\"sgd\"").unwrap();
        assert_eq!(method, Method::Sgd);
        assert_eq!(serde_json::to_string(&Method::Adam).unwrap(), "\"adam\"");
    }
}
