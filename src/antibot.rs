//! Desktop User-Agent rotation for the per-URL fetch task.

/// Realistic desktop user agents, rotated per fetch.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

/// Picks a user agent for a single fetch.
pub fn random_user_agent() -> &'static str {
    use rand::Rng;
    let mut rng = rand::rng();
    let index = rng.random_range(0..USER_AGENTS.len());
    USER_AGENTS[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agents_are_nonempty_and_look_like_browsers() {
        assert!(!USER_AGENTS.is_empty());
        for ua in USER_AGENTS {
            assert!(ua.contains("Mozilla"));
        }
    }

    #[test]
    fn random_user_agent_is_one_of_the_table() {
        let ua = random_user_agent();
        assert!(USER_AGENTS.contains(&ua));
    }
}
