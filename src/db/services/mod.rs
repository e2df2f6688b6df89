pub mod city_service;
pub mod prediction_service;
pub mod weather_service;
