mod passthrough;
mod record;
mod rename;
