mod interruption;
mod lifecycle;
