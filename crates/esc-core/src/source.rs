// ── Line data source ──
//
// The read side of the backend as seen by command handlers. The HTTP
// client implements it; tests substitute in-memory fakes.

use uuid::Uuid;

use crate::error::CoreError;
use esc_api::{LightingClient, Line, LineGroup, LineStatus, NewLine};

/// Fetches line snapshots, line state and groups.
#[allow(async_fn_in_trait)]
pub trait LineSource {
    async fn fetch_lines(&self) -> Result<Vec<Line>, CoreError>;

    async fn fetch_line(&self, id: Uuid) -> Result<Line, CoreError>;

    async fn fetch_lines_status(&self) -> Result<Vec<LineStatus>, CoreError>;

    async fn fetch_groups(&self) -> Result<Vec<LineGroup>, CoreError>;

    async fn create_line(&self, line: &NewLine) -> Result<Line, CoreError>;

    /// State of one line, picked out of the state collection.
    ///
    /// The backend keeps one state record per line; zero or several
    /// records for `id` are reported rather than guessed around.
    async fn fetch_line_state(&self, id: Uuid) -> Result<LineStatus, CoreError> {
        single_state(self.fetch_lines_status().await?, id)
    }
}

fn single_state(states: Vec<LineStatus>, id: Uuid) -> Result<LineStatus, CoreError> {
    let mut matching = states.into_iter().filter(|s| s.line_id == id);
    let first = matching.next().ok_or_else(|| CoreError::NotFound {
        entity_type: "line state".into(),
        identifier: id.to_string(),
    })?;

    let extra = matching.count();
    if extra > 0 {
        return Err(CoreError::Ambiguous {
            entity_type: "line state".into(),
            identifier: id.to_string(),
            count: extra + 1,
        });
    }
    Ok(first)
}

impl LineSource for LightingClient {
    async fn fetch_lines(&self) -> Result<Vec<Line>, CoreError> {
        Ok(self.list_lines().await?)
    }

    async fn fetch_line(&self, id: Uuid) -> Result<Line, CoreError> {
        Ok(self.get_line(id).await?)
    }

    async fn fetch_lines_status(&self) -> Result<Vec<LineStatus>, CoreError> {
        Ok(self.list_line_states().await?)
    }

    async fn fetch_groups(&self) -> Result<Vec<LineGroup>, CoreError> {
        Ok(self.list_groups().await?)
    }

    async fn create_line(&self, line: &NewLine) -> Result<Line, CoreError> {
        Ok(LightingClient::create_line(self, line).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    struct FixedStates(Vec<LineStatus>);

    impl LineSource for FixedStates {
        async fn fetch_lines(&self) -> Result<Vec<Line>, CoreError> {
            Ok(Vec::new())
        }

        async fn fetch_line(&self, id: Uuid) -> Result<Line, CoreError> {
            Err(CoreError::NotFound {
                entity_type: "line".into(),
                identifier: id.to_string(),
            })
        }

        async fn fetch_lines_status(&self) -> Result<Vec<LineStatus>, CoreError> {
            Ok(self.0.clone())
        }

        async fn fetch_groups(&self) -> Result<Vec<LineGroup>, CoreError> {
            Ok(Vec::new())
        }

        async fn create_line(&self, _line: &NewLine) -> Result<Line, CoreError> {
            Err(CoreError::Internal("read-only".into()))
        }
    }

    fn state(id: Uuid, relay: &str) -> LineStatus {
        LineStatus {
            line_id: id,
            relay: Some(relay.into()),
            mode: None,
            params: BTreeMap::new(),
        }
    }

    #[test]
    fn picks_the_single_matching_state() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let source = FixedStates(vec![state(a, "on"), state(b, "off")]);

        let got = tokio_test::block_on(source.fetch_line_state(b)).unwrap();
        assert_eq!(got.relay.as_deref(), Some("off"));
    }

    #[test]
    fn missing_state_is_not_found() {
        let source = FixedStates(vec![state(Uuid::new_v4(), "on")]);

        let err = tokio_test::block_on(source.fetch_line_state(Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }), "got: {err:?}");
    }

    #[test]
    fn duplicate_states_are_ambiguous() {
        let id = Uuid::new_v4();
        let source = FixedStates(vec![state(id, "on"), state(id, "off")]);

        let err = tokio_test::block_on(source.fetch_line_state(id)).unwrap_err();
        assert!(matches!(err, CoreError::Ambiguous { count: 2, .. }), "got: {err:?}");
    }
}
