mod ecosystem_validation;
mod snapshot_drift;
mod test_utils;
