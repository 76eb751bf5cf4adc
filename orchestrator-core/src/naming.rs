/// Derives the resource names for a server's bundle. Every resource a
/// server owns is named from its id alone, which is what makes deploy/wake/
/// hibernate/delete idempotent: re-running an operation always resolves the
/// same names, never creates a sibling.
#[derive(Debug, Clone)]
pub struct ResourceNames {
    pub server_id: i64,
}

impl ResourceNames {
    pub fn new(server_id: i64) -> Self {
        ResourceNames { server_id }
    }

    pub fn network(&self) -> String {
        format!("net-{}", self.server_id)
    }

    pub fn game_container(&self) -> String {
        format!("game-{}", self.server_id)
    }

    pub fn proxy_container(&self) -> String {
        format!("proxy-{}", self.server_id)
    }

    pub fn volume(&self) -> String {
        format!("game-data-{}", self.server_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_derived_only_from_the_id() {
        let a = ResourceNames::new(42);
        let b = ResourceNames::new(42);
        assert_eq!(a.network(), b.network());
        assert_eq!(a.game_container(), "game-42");
        assert_eq!(a.proxy_container(), "proxy-42");
        assert_eq!(a.volume(), "game-data-42");
    }
}
