mod anthropic;
mod google;
mod openai;
mod service;
