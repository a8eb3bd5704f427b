
mod create;
mod update;
