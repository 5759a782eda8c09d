
mod definition;
mod model;
mod scope;
