use std::borrow::Cow;

use crate::ir::SqlFunction;

/// How a function call is spelled.
///
/// A plain function formats as `name(prefix arg, arg suffix)`. An operator
/// formats as `arg0 name prefix arg1 suffix ...`, with prefix and suffix
/// wrapped around every argument after the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: Cow<'static, str>,
    pub is_operator: bool,
    pub arg_prefix: Cow<'static, str>,
    pub arg_suffix: Cow<'static, str>,
}

impl FunctionInfo {
    pub fn call(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            is_operator: false,
            arg_prefix: Cow::Borrowed(""),
            arg_suffix: Cow::Borrowed(""),
        }
    }

    pub fn operator(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            is_operator: true,
            ..Self::call(name)
        }
    }

    pub fn with_affixes(
        mut self,
        prefix: impl Into<Cow<'static, str>>,
        suffix: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.arg_prefix = prefix.into();
        self.arg_suffix = suffix.into();
        self
    }
}

/// ANSI-leaning spellings shared by the bundled dialects.
///
/// `In` and `Cast` have dedicated syntax and are written by the formatter
/// directly.
pub fn default_function(function: &SqlFunction) -> Option<FunctionInfo> {
    Some(match function {
        SqlFunction::Concat => FunctionInfo::call("CONCAT"),
        SqlFunction::Coalesce => FunctionInfo::call("COALESCE"),
        SqlFunction::Upper => FunctionInfo::call("UPPER"),
        SqlFunction::Lower => FunctionInfo::call("LOWER"),
        SqlFunction::Trim => FunctionInfo::call("TRIM"),
        SqlFunction::Length => FunctionInfo::call("LENGTH"),
        SqlFunction::Substring => FunctionInfo::call("SUBSTRING"),
        SqlFunction::StartsWith => FunctionInfo::operator("LIKE").with_affixes("(", " || '%')"),
        SqlFunction::EndsWith => FunctionInfo::operator("LIKE").with_affixes("('%' || ", ")"),
        SqlFunction::ContainsString => {
            FunctionInfo::operator("LIKE").with_affixes("('%' || ", " || '%')")
        }
        SqlFunction::Like => FunctionInfo::operator("LIKE"),
        SqlFunction::Abs => FunctionInfo::call("ABS"),
        SqlFunction::Round => FunctionInfo::call("ROUND"),
        SqlFunction::Now => FunctionInfo::call("NOW"),
        SqlFunction::Year => FunctionInfo::call("EXTRACT").with_affixes("YEAR FROM ", ""),
        SqlFunction::Month => FunctionInfo::call("EXTRACT").with_affixes("MONTH FROM ", ""),
        SqlFunction::Day => FunctionInfo::call("EXTRACT").with_affixes("DAY FROM ", ""),
        SqlFunction::RowNumber => FunctionInfo::call("ROW_NUMBER"),
        SqlFunction::Custom(name) => FunctionInfo::call(name.clone()),
        SqlFunction::In | SqlFunction::Cast => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_is_like_operator() {
        let info = default_function(&SqlFunction::StartsWith).unwrap();
        assert!(info.is_operator);
        assert_eq!(info.name, "LIKE");
        assert_eq!(info.arg_suffix, " || '%')");
    }

    #[test]
    fn test_custom_keeps_name() {
        let info = default_function(&SqlFunction::Custom("SOUNDEX".into())).unwrap();
        assert_eq!(info, FunctionInfo::call("SOUNDEX"));
        assert!(default_function(&SqlFunction::In).is_none());
    }
}
