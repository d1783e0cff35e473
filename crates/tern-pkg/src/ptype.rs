//! Package types and override priority.

use std::fmt;
use std::str::FromStr;

/// The type of a package.
///
/// The type decides which descriptors a package is expected to carry and,
/// through [`PkgType::priority`], whose syscfg overrides win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PkgType {
    /// Code generated during the build.
    Generated,
    /// Compiler definition.
    Compiler,
    /// Ordinary library.
    Lib,
    /// Board support package.
    Bsp,
    /// Unit-test harness package.
    Unittest,
    /// Application.
    App,
    /// Build target.
    Target,
}

impl PkgType {
    /// Syscfg override priority; higher overrides lower.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Generated => 0,
            Self::Compiler => 1,
            Self::Lib => 2,
            Self::Bsp => 3,
            Self::Unittest => 4,
            Self::App => 5,
            Self::Target => 6,
        }
    }

    /// Descriptor-file spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Compiler => "compiler",
            Self::Lib => "lib",
            Self::Bsp => "bsp",
            Self::Unittest => "unittest",
            Self::App => "app",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for PkgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PkgType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generated" => Ok(Self::Generated),
            "compiler" => Ok(Self::Compiler),
            "lib" => Ok(Self::Lib),
            "bsp" => Ok(Self::Bsp),
            "unittest" => Ok(Self::Unittest),
            "app" => Ok(Self::App),
            "target" => Ok(Self::Target),
            other => Err(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering_matches_type_ordering() {
        let types = [
            PkgType::Generated,
            PkgType::Compiler,
            PkgType::Lib,
            PkgType::Bsp,
            PkgType::Unittest,
            PkgType::App,
            PkgType::Target,
        ];
        for pair in types.windows(2) {
            assert!(pair[0].priority() < pair[1].priority());
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn roundtrip_through_strings() {
        for t in [PkgType::Lib, PkgType::Target, PkgType::Bsp] {
            assert_eq!(t.as_str().parse::<PkgType>().unwrap(), t);
        }
        assert!("widget".parse::<PkgType>().is_err());
    }
}
