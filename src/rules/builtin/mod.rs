mod date_bounds;
mod email;
mod no_string;
mod number_bounds;
mod phone;
mod required;
mod string_length;
mod whitespace;

use super::ValidationRule;

/// Returns all built-in rules, in suggestion order.
pub fn all_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(required::RequiredRule),
        Box::new(whitespace::WhitespaceRule),
        Box::new(email::EmailRule),
        Box::new(phone::PhoneRule),
        Box::new(string_length::MaxStringRule),
        Box::new(date_bounds::DateBoundRule::min()),
        Box::new(date_bounds::DateBoundRule::max()),
        Box::new(no_string::NoStringRule),
        Box::new(number_bounds::NumberBoundRule::min()),
        Box::new(number_bounds::NumberBoundRule::max()),
    ]
}
