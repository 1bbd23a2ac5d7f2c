use academy_api::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("invalid video id: {0}")]
    InvalidVideoId(u64),

    #[error(transparent)]
    Api(#[from] ApiError),
}
