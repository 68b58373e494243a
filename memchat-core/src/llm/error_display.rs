/// Prefix a provider-facing error detail with the provider's display name.
pub fn format_llm_error(provider: &str, detail: &str) -> String {
    format!("{provider}: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_provider_name() {
        assert_eq!(
            format_llm_error("Ollama", "HTTP 500: boom"),
            "Ollama: HTTP 500: boom"
        );
    }
}
