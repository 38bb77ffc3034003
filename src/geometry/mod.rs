pub(crate) mod aspect;
