//! Configuration preparation: URL pagination overrides and header normalization

use crate::error::CoreResult;
use crate::template;
use crate::types::{
    ActionConfiguration, DatasourceConfiguration, PaginationField, PaginationType, Param,
};

/// Point the datasource at the cursor URL for `direction`.
///
/// `next` is form-decoded (`+` becomes a space) before use while `prev` is taken
/// verbatim. Either direction clears the action's `path` and `queryParameters`,
/// since the cursor URL is self-contained. A missing cursor leaves the datasource
/// URL as it was.
pub fn rewrite_for_pagination(
    mut action_config: ActionConfiguration,
    mut datasource_config: DatasourceConfiguration,
    direction: PaginationField,
) -> (ActionConfiguration, DatasourceConfiguration) {
    match direction {
        PaginationField::Next => match action_config.next.as_deref() {
            Some(next) => match decode_cursor(next) {
                Some(url) => datasource_config.url = Some(url),
                None => tracing::warn!("Next page cursor is not valid UTF-8 after decoding"),
            },
            None => tracing::debug!("Next page requested but no cursor is configured"),
        },
        PaginationField::Prev => match action_config.prev.clone() {
            Some(prev) => datasource_config.url = Some(prev),
            None => tracing::debug!("Previous page requested but no cursor is configured"),
        },
    }

    action_config.path = Some(String::new());
    action_config.query_parameters = None;

    (action_config, datasource_config)
}

fn decode_cursor(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|s| s.into_owned())
}

/// Drop headers whose key is absent or empty
pub fn strip_empty_headers(action_config: &mut ActionConfiguration) {
    action_config.headers.retain(|header| !header.has_empty_key());
}

/// Produce the configurations handed to the plugin executor.
///
/// Placeholders are rendered only when parameters were supplied. Pagination is
/// applied when the action is URL-paginated and a direction was requested. Empty
/// header keys are always stripped.
pub fn prepare_configurations(
    action_config: &ActionConfiguration,
    datasource_config: &DatasourceConfiguration,
    params: &[Param],
    pagination: Option<PaginationField>,
) -> CoreResult<(ActionConfiguration, DatasourceConfiguration)> {
    let (action_config, datasource_config) = if params.is_empty() {
        (action_config.clone(), datasource_config.clone())
    } else {
        let substitutions = template::substitution_map(params);
        (
            template::resolve(action_config, &substitutions)?,
            template::resolve(datasource_config, &substitutions)?,
        )
    };

    let (mut action_config, datasource_config) =
        match (action_config.pagination_type, pagination) {
            (PaginationType::Url, Some(direction)) => {
                rewrite_for_pagination(action_config, datasource_config, direction)
            }
            (_, _) => (action_config, datasource_config),
        };

    strip_empty_headers(&mut action_config);
    Ok((action_config, datasource_config))
}
