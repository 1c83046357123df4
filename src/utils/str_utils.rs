pub trait StringExtensions {
    /// Trim surrounding whitespace and fold to lowercase, so values that
    /// differ only in case collapse to one representation.
    /// E.g. `"  Paris ".case_fold() == "paris"`
    fn case_fold(&self) -> String;
}

impl StringExtensions for str {
    fn case_fold(&self) -> String {
        self.trim().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_fold() {
        assert_eq!("  Paris ".case_fold(), "paris");
        assert_eq!("SUMMER Trip".case_fold(), "summer trip");
        assert_eq!("déjà Vu".case_fold(), "déjà vu");
        assert_eq!("already lower".case_fold(), "already lower");
    }
}
