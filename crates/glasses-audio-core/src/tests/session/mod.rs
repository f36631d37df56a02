mod controller;
mod plan;
