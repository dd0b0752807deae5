/// Categories a draft may carry.
pub const CATEGORIES: [&str; 15] = [
    "Food",
    "Transportation",
    "Entertainment",
    "Utilities",
    "Healthcare",
    "Shopping",
    "Groceries",
    "Dining",
    "Travel",
    "Education",
    "Personal Care",
    "Home & Garden",
    "Electronics",
    "Clothing",
    "Other",
];

/// Instruction sent with every receipt image.
pub const EXTRACTION_PROMPT: &str = r#"You are an expert assistant specialized in extracting financial information from receipt images. Analyze the attached receipt image and extract the following fields into a JSON object.

- "amount": the total amount paid (usually at the bottom, labeled "Total", "Amount Due" or similar). Return a number, e.g. 25.99. If taxes or tips are included, use the final total.
- "date": the transaction date. Convert it to ISO format "YYYY-MM-DDTHH:mm:ss.sssZ". If no time is shown, use "00:00:00.000Z".
- "description": a short description of the purchase, e.g. "Grocery shopping", "Restaurant meal".
- "merchantName": the business name, e.g. "Walmart", "Shell".
- "category": one of Food, Transportation, Entertainment, Utilities, Healthcare, Shopping, Groceries, Dining, Travel, Education, Personal Care, Home & Garden, Electronics, Clothing, Other.

Rules:
- If a field cannot be found, set it to null.
- Return ONLY the JSON object, without explanations or markdown.
- The JSON must be valid.

Example: {"amount": 45.67, "date": "2023-10-15T00:00:00.000Z", "description": "Weekly groceries", "merchantName": "Safeway", "category": "Groceries"}"#;

/// Canonical spelling of `value` when it names a known category.
pub(crate) fn canonical_category(value: &str) -> Option<&'static str> {
    let value = value.trim();
    CATEGORIES
        .iter()
        .copied()
        .find(|category| category.eq_ignore_ascii_case(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_every_category() {
        for category in CATEGORIES {
            assert!(EXTRACTION_PROMPT.contains(category), "{category}");
        }
    }

    #[test]
    fn categories_match_case_insensitively() {
        assert_eq!(canonical_category(" groceries "), Some("Groceries"));
        assert_eq!(canonical_category("HOME & GARDEN"), Some("Home & Garden"));
        assert_eq!(canonical_category("Fuel"), None);
    }
}
