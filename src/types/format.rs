use super::*;

use std::fmt;

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "Void"),
            Type::String => write!(f, "String"),
            Type::Scalar(kind) => write!(f, "{}", kind),
            Type::Vector { scalar, len } => write!(f, "{}{}", scalar, len),
            Type::Matrix { dim } => write!(f, "Float{}x{}", dim, dim),
            Type::Array { elem } => write!(f, "{} Array", elem),
            Type::Fn { params, ret } => {
                let params_str = params
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                if params.is_empty() {
                    write!(f, "-> {}", ret)
                } else {
                    write!(f, "{} -> {}", params_str, ret)
                }
            }
            Type::Code { annotation, body } => write!(f, "{}{}>", annotation.opener(), body),
        }
    }
}
