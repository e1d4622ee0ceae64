use std::fmt::{ self,
                Display,
                Formatter };
use crate::lang::tokenizing::NumberType;



/// Core value enumeration used by the engine.  Everything that can live on the data stack, the
/// return stack, or in a memory cell is one of these.
///
/// Values are always moved or copied onto the stacks, two stack slots never share mutable state.
#[derive(Clone, Debug)]
pub enum Value
{
    /// A signed 64-bit integer.
    Int(i64),

    /// A floating-point value.
    Float(f64),

    /// The result of a comparison.  Behaves as -1 for true and 0 for false in arithmetic.
    Flag(bool),

    /// An index into the interpreter's flat cell store.
    Address(usize),

    /// Text pushed by `S"`.  The count travels separately as an integer, the way Forth passes
    /// `c-addr u` pairs.
    String(String)
}


/// Convert an arbitrary data type to a Value.
pub trait ToValue
{
    /// Implement to handle the actual conversion.
    fn to_value(&self) -> Value;
}


impl ToValue for i64
{
    fn to_value(&self) -> Value
    {
        Value::Int(*self)
    }
}


impl ToValue for usize
{
    fn to_value(&self) -> Value
    {
        Value::Int(*self as i64)
    }
}


impl ToValue for f64
{
    fn to_value(&self) -> Value
    {
        Value::Float(*self)
    }
}


impl ToValue for bool
{
    fn to_value(&self) -> Value
    {
        Value::Flag(*self)
    }
}


impl ToValue for &str
{
    fn to_value(&self) -> Value
    {
        Value::String(self.to_string())
    }
}


impl ToValue for String
{
    fn to_value(&self) -> Value
    {
        Value::String(self.clone())
    }
}


impl ToValue for NumberType
{
    fn to_value(&self) -> Value
    {
        match self
        {
            NumberType::Int(value)   => Value::Int(*value),
            NumberType::Float(value) => Value::Float(*value)
        }
    }
}


impl From<i64> for Value
{
    fn from(value: i64) -> Value
    {
        Value::Int(value)
    }
}


impl From<bool> for Value
{
    fn from(value: bool) -> Value
    {
        Value::Flag(value)
    }
}


impl From<f64> for Value
{
    fn from(value: f64) -> Value
    {
        Value::Float(value)
    }
}


impl From<&str> for Value
{
    fn from(value: &str) -> Value
    {
        Value::String(value.to_string())
    }
}


impl Default for Value
{
    fn default() -> Value
    {
        Value::Int(0)
    }
}


/// Numbers compare by value regardless of how they're tagged, so a true flag equals -1 and an
/// address equals its index.  Strings only ever equal other strings.
impl PartialEq for Value
{
    fn eq(&self, other: &Value) -> bool
    {
        match ( self, other )
        {
            ( Value::String(a), Value::String(b) ) => a == b,
            ( Value::String(_), _ ) | ( _, Value::String(_) ) => false,

            _ =>
                {
                    match ( self.as_number(), other.as_number() )
                    {
                        ( Some(NumberType::Int(a)), Some(NumberType::Int(b)) ) => a == b,
                        ( Some(a), Some(b) ) => as_f64(a) == as_f64(b),
                        _ => false
                    }
                }
        }
    }
}


fn as_f64(number: NumberType) -> f64
{
    match number
    {
        NumberType::Int(value)   => value as f64,
        NumberType::Float(value) => value
    }
}


/// Print the value the way `.` shows it.
impl Display for Value
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result
    {
        match self
        {
            Value::Int(value)     => write!(f, "{}", value),
            Value::Float(value)   => write!(f, "{:?}", value),
            Value::Flag(value)    => write!(f, "{}", if *value { -1 } else { 0 }),
            Value::Address(value) => write!(f, "{}", value),
            Value::String(value)  => write!(f, "{}", value)
        }
    }
}


impl Value
{
    /// Source text that pushes this value when evaluated.
    pub fn to_source(&self) -> String
    {
        match self
        {
            Value::Int(value)                     => value.to_string(),
            Value::Float(value) if value.is_nan() => "1e999 1e999 -".to_string(),
            Value::Float(value)                   => NumberType::Float(*value).to_string(),
            Value::Flag(true)                     => "TRUE".to_string(),
            Value::Flag(false)                    => "FALSE".to_string(),
            Value::Address(value)                 => value.to_string(),
            Value::String(value)                  => format!("S\" {}\" DROP", value)
        }
    }

    /// The Forth convention for true and false.
    pub fn flag_to_int(flag: bool) -> i64
    {
        if flag { -1 } else { 0 }
    }

    /// A short name for the kind of value, used in type mismatch reports.
    pub fn type_name(&self) -> &'static str
    {
        match self
        {
            Value::Int(_)     => "integer",
            Value::Float(_)   => "float",
            Value::Flag(_)    => "flag",
            Value::Address(_) => "address",
            Value::String(_)  => "string"
        }
    }

    /// View the value as a number.  Flags become -1/0 and addresses their index.
    pub fn as_number(&self) -> Option<NumberType>
    {
        match self
        {
            Value::Int(value)     => Some(NumberType::Int(*value)),
            Value::Float(value)   => Some(NumberType::Float(*value)),
            Value::Flag(value)    => Some(NumberType::Int(Value::flag_to_int(*value))),
            Value::Address(value) => Some(NumberType::Int(*value as i64)),
            Value::String(_)      => None
        }
    }

    /// View the value as an integer.  Floats aren't silently truncated.
    pub fn as_int(&self) -> Option<i64>
    {
        match self.as_number()
        {
            Some(NumberType::Int(value)) => Some(value),
            _ => None
        }
    }

    /// Anything non-zero is true.
    pub fn as_flag(&self) -> Option<bool>
    {
        match self
        {
            Value::Flag(value) => Some(*value),
            Value::Float(value) => Some(*value != 0.0),
            _ => self.as_int().map(|value| value != 0)
        }
    }
}



#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn numbers_compare_across_tags()
    {
        assert_eq!(Value::Flag(true), Value::Int(-1));
        assert_eq!(Value::Flag(false), Value::Int(0));
        assert_eq!(Value::Address(3), Value::Int(3));
        assert_eq!(Value::Float(2.0), Value::Int(2));
        assert_ne!(Value::String("1".to_string()), Value::Int(1));
        assert_eq!(Value::from("abc"), "abc".to_value());
    }

    #[test]
    fn displays_like_dot()
    {
        assert_eq!(Value::Int(7).to_string(), "7");
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::Flag(true).to_string(), "-1");
        assert_eq!(Value::Flag(false).to_string(), "0");
        assert_eq!(Value::String("hi".to_string()).to_string(), "hi");
    }

    #[test]
    fn source_form_pushes_the_value()
    {
        assert_eq!(Value::Int(-4).to_source(), "-4");
        assert_eq!(Value::Float(2.0).to_source(), "2.0");
        assert_eq!(Value::Float(f64::NEG_INFINITY).to_source(), "-1e999");
        assert_eq!(Value::Flag(false).to_source(), "FALSE");
        assert_eq!(Value::String("a b".to_string()).to_source(), "S\" a b\" DROP");
    }

    #[test]
    fn truthiness()
    {
        assert_eq!(Value::Int(0).as_flag(), Some(false));
        assert_eq!(Value::Int(5).as_flag(), Some(true));
        assert_eq!(Value::Float(0.0).as_flag(), Some(false));
        assert_eq!(Value::String(String::new()).as_flag(), None);
        assert_eq!(Value::Float(1.5).as_int(), None);
    }
}
