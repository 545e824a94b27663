use crate::server::{Result, ServerError};
use axum::{
    extract::FromRequestParts,
    http::{header::ACCEPT, request::Parts},
};
use mime::Mime;
use std::convert::Infallible;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Format {
    Html,
    Js,
    Json,
}

impl Format {
    #[must_use]
    pub fn media_types(self) -> &'static [&'static str] {
        match self {
            Format::Html => &["text/html", "application/xhtml+xml"],
            Format::Js => &[
                "text/javascript",
                "application/javascript",
                "application/ecmascript",
                "application/x-ecmascript",
            ],
            Format::Json => &["application/json"],
        }
    }

    fn matches(self, range: &Mime) -> bool {
        if range.type_() == mime::STAR {
            return true;
        }

        if range.subtype() == mime::STAR {
            let range_type = range.type_().as_str();
            return self
                .media_types()
                .iter()
                .any(|media_type| media_type.split('/').next() == Some(range_type));
        }

        self.media_types().contains(&range.essence_str())
    }
}

/// Media ranges from the `Accept` header, most preferred first.
#[derive(Clone, PartialEq, Debug)]
pub struct AcceptedFormats(Vec<(Mime, f32)>);

fn specificity(range: &Mime) -> u8 {
    if range.type_() == mime::STAR {
        0
    } else if range.subtype() == mime::STAR {
        1
    } else {
        2
    }
}

impl AcceptedFormats {
    #[must_use]
    pub fn parse(header: Option<&str>) -> Self {
        let mut weighted: Vec<(Mime, f32)> = header
            .into_iter()
            .flat_map(|header| header.split(','))
            .filter_map(|range| range.trim().parse::<Mime>().ok())
            .map(|range| {
                let quality = range
                    .get_param("q")
                    .and_then(|q| q.as_str().parse::<f32>().ok())
                    .unwrap_or(1.0);
                (range, quality)
            })
            .collect();

        if weighted.is_empty() {
            return Self(vec![(mime::STAR_STAR, 1.0)]);
        }

        weighted.sort_by(|(_, a), (_, b)| b.total_cmp(a));
        Self(weighted)
    }

    fn quality(&self, format: Format) -> f32 {
        self.0
            .iter()
            .filter(|(range, _)| format.matches(range))
            .min_by_key(|(range, _)| std::cmp::Reverse(specificity(range)))
            .map_or(0.0, |(_, quality)| *quality)
    }

    #[must_use]
    pub fn preferred(&self, offered: &[Format]) -> Option<Format> {
        self.0
            .iter()
            .filter(|(_, quality)| *quality > 0.0)
            .find_map(|(range, _)| {
                offered
                    .iter()
                    .copied()
                    .find(|format| format.matches(range) && self.quality(*format) > 0.0)
            })
    }

    pub fn negotiate(&self, offered: &[Format]) -> Result<Format> {
        self.preferred(offered).ok_or(ServerError::NotAcceptable)
    }
}

impl<S> FromRequestParts<S> for AcceptedFormats
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(ACCEPT)
            .and_then(|value| value.to_str().ok());

        Ok(Self::parse(header))
    }
}
