mod codec_coverage;
mod transaction_coverage;
