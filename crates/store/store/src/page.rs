use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Default number of items returned when the caller does not specify a
/// page size.
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Hard upper bound on page size; larger requests are clamped.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination parameters for list operations.
///
/// Tokens are opaque to callers. The reference backends encode offsets,
/// but that is an implementation detail other backends are free to
/// change.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PageRequest {
    /// Requested page size. Zero means default; values above
    /// [`MAX_PAGE_SIZE`] are clamped.
    #[serde(default)]
    pub page_size: u32,
    /// Opaque continuation token from a previous response.
    #[serde(default)]
    pub page_token: Option<String>,
}

impl PageRequest {
    /// The effective page size after defaulting and clamping.
    #[must_use]
    pub fn effective_size(&self) -> usize {
        let size = if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size.min(MAX_PAGE_SIZE)
        };
        size as usize
    }
}

/// One page of results. An absent `next_page_token` means end-of-stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    /// A page with no items and no continuation.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_page_token: None,
        }
    }
}

/// Encode an offset as an opaque continuation token.
#[must_use]
pub fn encode_offset_token(offset: usize) -> String {
    format!("o{offset}")
}

/// Decode a continuation token produced by [`encode_offset_token`].
/// `None` decodes to offset 0.
pub fn decode_offset_token(token: Option<&str>) -> Result<usize, StoreError> {
    match token {
        None | Some("") => Ok(0),
        Some(t) => t
            .strip_prefix('o')
            .and_then(|rest| rest.parse().ok())
            .ok_or_else(|| StoreError::Invalid(format!("page token {t:?}"))),
    }
}

/// Slice a fully materialised listing into one page.
///
/// Shared by the in-memory backends; SQL backends paginate in the query
/// instead.
pub fn paginate<T>(mut items: Vec<T>, req: &PageRequest) -> Result<Page<T>, StoreError> {
    let offset = decode_offset_token(req.page_token.as_deref())?;
    let size = req.effective_size();
    if offset >= items.len() {
        return Ok(Page::empty());
    }
    let rest = items.split_off(offset);
    let mut window: Vec<T> = rest;
    let next = if window.len() > size {
        window.truncate(size);
        Some(encode_offset_token(offset + size))
    } else {
        None
    };
    Ok(Page {
        items: window,
        next_page_token: next,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_defaults_and_clamps() {
        assert_eq!(PageRequest::default().effective_size(), 50);
        let req = PageRequest {
            page_size: 250,
            page_token: None,
        };
        assert_eq!(req.effective_size(), 100);
        let req = PageRequest {
            page_size: 7,
            page_token: None,
        };
        assert_eq!(req.effective_size(), 7);
    }

    #[test]
    fn token_roundtrip() {
        let token = encode_offset_token(150);
        assert_eq!(decode_offset_token(Some(&token)).unwrap(), 150);
        assert_eq!(decode_offset_token(None).unwrap(), 0);
        assert!(decode_offset_token(Some("garbage")).is_err());
    }

    #[test]
    fn paginate_walks_to_end() {
        let items: Vec<u32> = (0..120).collect();
        let first = paginate(
            items.clone(),
            &PageRequest {
                page_size: 0,
                page_token: None,
            },
        )
        .unwrap();
        assert_eq!(first.items.len(), 50);
        let token = first.next_page_token.clone().unwrap();

        let second = paginate(
            items.clone(),
            &PageRequest {
                page_size: 0,
                page_token: Some(token),
            },
        )
        .unwrap();
        assert_eq!(second.items[0], 50);

        let third = paginate(
            items,
            &PageRequest {
                page_size: 0,
                page_token: second.next_page_token,
            },
        )
        .unwrap();
        assert_eq!(third.items.len(), 20);
        assert!(third.next_page_token.is_none());
    }

    #[test]
    fn paginate_past_end_is_empty() {
        let page = paginate(
            vec![1, 2, 3],
            &PageRequest {
                page_size: 10,
                page_token: Some(encode_offset_token(10)),
            },
        )
        .unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
