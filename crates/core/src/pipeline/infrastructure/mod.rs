pub mod threaded_tick_scheduler;
