pub(crate) mod caption_session;
