mod batch_reads;
mod round_trip;
mod table_lifecycle;
