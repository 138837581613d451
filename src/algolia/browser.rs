//! Cursor-based browse pagination as a stream of object ids.

use async_stream::try_stream;
use futures_core::Stream;
use reqwest::Method;

use super::client::{AlgoliaProvider, read_json};
use super::types::{BrowseRequest, BrowseResponse};
use crate::provider::ProviderError;

const BROWSE_PAGE_SIZE: usize = 1000;

/// Stream the object ids of every record matching `filters`.
pub fn stream_object_ids<'a>(
    provider: &'a AlgoliaProvider,
    index_name: &'a str,
    filters: String,
) -> impl Stream<Item = Result<String, ProviderError>> + 'a {
    try_stream! {
        let url = provider.endpoint(index_name, &["browse"])?;
        let mut request = BrowseRequest {
            filters: Some(filters),
            attributes_to_retrieve: Some(vec!["objectID".to_string()]),
            hits_per_page: Some(BROWSE_PAGE_SIZE),
            cursor: None,
        };

        loop {
            let response = provider
                .request(Method::POST, url.clone())
                .json(&request)
                .send()
                .await?;
            let BrowseResponse { hits, cursor } = read_json(response).await?;
            tracing::trace!(index = index_name, hits = hits.len(), "Browsed Algolia page");
            for hit in hits {
                yield hit.object_id;
            }

            match cursor {
                Some(cursor) => {
                    request = BrowseRequest {
                        cursor: Some(cursor),
                        ..BrowseRequest::default()
                    };
                }
                None => break,
            }
        }
    }
}
