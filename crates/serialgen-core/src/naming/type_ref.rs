use crate::error::{GenerateError, Result};
use crate::naming::PrimitiveKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// TypeRef identifies a type: qualified name, generic arguments and array rank.
///
/// The textual form is `pkg.Name<Arg, ...>[][]`. Nested types use `$` in the
/// qualified name (`pkg.Outer$Inner`), exactly as in a binary class name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeRef {
    name: String,
    args: Vec<TypeRef>,
    rank: usize,
}

impl TypeRef {
    /// A non-array, non-generic reference to `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            rank: 0,
        }
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::named(kind.name())
    }

    pub fn with_args(mut self, args: Vec<TypeRef>) -> Self {
        self.args = args;
        self
    }

    /// One more array dimension around `element`.
    pub fn array_of(element: TypeRef) -> Self {
        element.wrap(1)
    }

    /// Parse the textual form.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser {
            input,
            chars: input.char_indices().peekable(),
        };
        let parsed = parser.type_ref()?;
        parser.skip_ws();
        if let Some((at, c)) = parser.chars.next() {
            return Err(parser.error(format!("unexpected '{}' at offset {}", c, at)));
        }
        Ok(parsed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[TypeRef] {
        &self.args
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn is_array(&self) -> bool {
        self.rank > 0
    }

    /// The primitive this refers to, if it is a rank-0 primitive.
    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        if self.rank == 0 {
            PrimitiveKind::from_name(&self.name)
        } else {
            None
        }
    }

    /// The component type of an array (`T[][]` → `T[]`).
    pub fn element(&self) -> Option<TypeRef> {
        (self.rank > 0).then(|| TypeRef {
            name: self.name.clone(),
            args: self.args.clone(),
            rank: self.rank - 1,
        })
    }

    /// The fully unwrapped element type (`T[][]` → `T`).
    pub fn leaf(&self) -> TypeRef {
        TypeRef {
            name: self.name.clone(),
            args: self.args.clone(),
            rank: 0,
        }
    }

    /// Add `rank` array dimensions.
    pub fn wrap(&self, rank: usize) -> TypeRef {
        TypeRef {
            name: self.name.clone(),
            args: self.args.clone(),
            rank: self.rank + rank,
        }
    }

    /// The erased reference, without generic arguments.
    pub fn raw(&self) -> TypeRef {
        TypeRef {
            name: self.name.clone(),
            args: Vec::new(),
            rank: self.rank,
        }
    }

    /// Binary name as used by the peer runtime: `pkg.Outer$Inner` for
    /// classes, `[Lpkg.Name;` / `[[I` for arrays. Generic arguments are erased.
    pub fn binary_name(&self) -> String {
        if self.rank == 0 {
            return self.name.clone();
        }
        let mut out = "[".repeat(self.rank);
        match PrimitiveKind::from_name(&self.name) {
            Some(p) => out.push(p.binary_code()),
            None => {
                out.push('L');
                out.push_str(&self.name);
                out.push(';');
            }
        }
        out
    }

    /// Qualified source name: nested separators rendered as `.`.
    pub fn source_name(&self) -> String {
        let mut out = self.name.replace('$', ".");
        for _ in 0..self.rank {
            out.push_str("[]");
        }
        out
    }

    /// Simple (unqualified) name of the leaf type.
    pub fn simple_name(&self) -> &str {
        self.name
            .rsplit(['.', '$'])
            .next()
            .unwrap_or(self.name.as_str())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", arg)?;
            }
            f.write_str(">")?;
        }
        for _ in 0..self.rank {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

impl From<TypeRef> for String {
    fn from(type_ref: TypeRef) -> String {
        type_ref.to_string()
    }
}

impl TryFrom<String> for TypeRef {
    type Error = GenerateError;
    fn try_from(s: String) -> Result<Self> {
        TypeRef::parse(&s)
    }
}

impl std::str::FromStr for TypeRef {
    type Err = GenerateError;
    fn from_str(s: &str) -> Result<Self> {
        TypeRef::parse(s)
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> GenerateError {
        GenerateError::InvalidTypeRef {
            input: self.input.to_string(),
            reason: reason.into(),
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        self.chars.next_if(|(_, c)| *c == expected).is_some()
    }

    fn type_ref(&mut self) -> Result<TypeRef> {
        self.skip_ws();
        let mut name = String::new();
        while let Some((_, c)) = self
            .chars
            .next_if(|(_, c)| c.is_alphanumeric() || matches!(*c, '_' | '.' | '$'))
        {
            name.push(c);
        }
        if name.is_empty() {
            return Err(self.error("expected a type name"));
        }
        if name.starts_with(['.', '$']) || name.ends_with(['.', '$']) || name.contains("..") {
            return Err(self.error(format!("malformed qualified name '{}'", name)));
        }

        let mut args = Vec::new();
        if self.eat('<') {
            loop {
                args.push(self.type_ref()?);
                if self.eat(',') {
                    continue;
                }
                if self.eat('>') {
                    break;
                }
                return Err(self.error("expected ',' or '>' in type arguments"));
            }
        }

        let mut rank = 0;
        while self.eat('[') {
            if !self.eat(']') {
                return Err(self.error("expected ']'"));
            }
            rank += 1;
        }

        Ok(TypeRef { name, args, rank })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("com.example.Point", "com.example.Point", 0)]
    #[case("com.example.Point[]", "com.example.Point", 1)]
    #[case("int[][]", "int", 2)]
    #[case(" java.util.List < com.example.Point [] > [] ", "java.util.List", 1)]
    fn test_parse(#[case] input: &str, #[case] name: &str, #[case] rank: usize) {
        let t = TypeRef::parse(input).unwrap();
        assert_eq!(t.name(), name);
        assert_eq!(t.rank(), rank);
    }

    #[test]
    fn test_parse_generic_args() {
        let t = TypeRef::parse("java.util.Map<java.lang.String, a.B[]>").unwrap();
        assert_eq!(t.args().len(), 2);
        assert_eq!(t.args()[1], TypeRef::named("a.B").wrap(1));
        assert_eq!(t.to_string(), "java.util.Map<java.lang.String, a.B[]>");
    }

    #[rstest]
    #[case("")]
    #[case("a.B[")]
    #[case("a.B<>")]
    #[case("a.B<c.D")]
    #[case(".a.B")]
    #[case("a..B")]
    #[case("a.B c.D")]
    fn test_parse_rejects(#[case] input: &str) {
        let err = TypeRef::parse(input).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidTypeRef { .. }));
    }

    #[test]
    fn test_unwrap_rewrap() {
        let t = TypeRef::parse("a.B[][]").unwrap();
        assert_eq!(t.leaf(), TypeRef::named("a.B"));
        assert_eq!(t.element(), Some(TypeRef::named("a.B").wrap(1)));
        assert_eq!(t.leaf().wrap(t.rank()), t);
        assert_eq!(TypeRef::named("a.B").element(), None);
    }

    #[test]
    fn test_binary_names() {
        assert_eq!(TypeRef::named("a.Outer$Inner").binary_name(), "a.Outer$Inner");
        assert_eq!(TypeRef::named("a.Outer$Inner").source_name(), "a.Outer.Inner");
        assert_eq!(TypeRef::named("a.B").wrap(2).binary_name(), "[[La.B;");
        assert_eq!(TypeRef::named("int").wrap(1).binary_name(), "[I");
        assert_eq!(
            TypeRef::parse("java.util.List<a.B>").unwrap().binary_name(),
            "java.util.List"
        );
    }

    #[test]
    fn test_serde_as_string() {
        let t = TypeRef::parse("a.B<c.D>[]").unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#""a.B<c.D>[]""#);
        let back: TypeRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_simple_name() {
        assert_eq!(TypeRef::named("a.Outer$Inner").simple_name(), "Inner");
        assert_eq!(TypeRef::named("Point").simple_name(), "Point");
    }
}
