//! Topic routing: inbound `(topic, payload)` → entity inbox messages.
//!
//! Data topics come from the configuration; several sensors may share a
//! topic, each extracting its own JSON field.  Control topics live under
//! the configured control prefix:
//!
//! ```text
//! <control>/default_heating_parameter | enable | log_level
//! <control>/zone/<zone>/weight | heating_parameter | room_compensation | sensors_average_type
//! <control>/sensors/<sensor>/weight | offset | scale
//! <control>/outside/temperature_average_type
//! ```

use std::collections::HashMap;

use crate::app::commands::{GlobalCommand, OutsideInput, SensorParameter, ZoneInput, ZoneParameter};
use crate::config::ControllerConfig;
use crate::error::{ParameterError, Result};
use crate::events::EngineEvent;
use crate::payload::bounded;
use crate::sensors::sensor_name;
use crate::zone::ZoneId;

/// Where one inbound message goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Zone(ZoneId, ZoneInput),
    Outside(OutsideInput),
    Engine(EngineEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataRoute {
    ZoneSensor { zone: ZoneId, sensor: usize },
    ZoneSetpoint(ZoneId),
    OutsideSensor(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SensorRef {
    Zone { zone: ZoneId, sensor: usize },
    Outside(usize),
}

pub struct TopicRouter {
    control_prefix: String,
    data: HashMap<String, Vec<DataRoute>>,
    zones: HashMap<String, ZoneId>,
    sensors: HashMap<String, SensorRef>,
}

impl TopicRouter {
    pub fn new(cfg: &ControllerConfig) -> Self {
        let mut data: HashMap<String, Vec<DataRoute>> = HashMap::new();
        let mut zones = HashMap::new();
        let mut sensors = HashMap::new();

        for (zone, zc) in cfg.zones.iter().enumerate() {
            zones.insert(zc.name.clone(), zone);
            if !zc.setpoint.topic.is_empty() {
                data.entry(zc.setpoint.topic.clone())
                    .or_default()
                    .push(DataRoute::ZoneSetpoint(zone));
            }
            let prefix = format!("zone-{}-", zc.name);
            for (sensor, sc) in zc.sensors.iter().enumerate() {
                data.entry(sc.topic.clone())
                    .or_default()
                    .push(DataRoute::ZoneSensor { zone, sensor });
                sensors.insert(
                    sensor_name(&prefix, sc.name.as_deref(), sensor),
                    SensorRef::Zone { zone, sensor },
                );
            }
        }
        for (sensor, sc) in cfg.outside.temperature_sensors.iter().enumerate() {
            data.entry(sc.topic.clone())
                .or_default()
                .push(DataRoute::OutsideSensor(sensor));
            sensors.insert(
                sensor_name("outside-temperature-", sc.name.as_deref(), sensor),
                SensorRef::Outside(sensor),
            );
        }

        Self {
            control_prefix: format!("{}/", cfg.control_topic),
            data,
            zones,
            sensors,
        }
    }

    /// Every configured data topic.
    pub fn data_topics(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Resolve one inbound message.  An unknown topic yields no deliveries;
    /// a malformed parameter or oversized payload is an error.
    pub fn route(&self, topic: &str, payload: &str) -> Result<Vec<Delivery>> {
        if let Some(routes) = self.data.get(topic) {
            let payload = bounded(payload)?;
            return Ok(routes
                .iter()
                .map(|r| match *r {
                    DataRoute::ZoneSensor { zone, sensor } => Delivery::Zone(
                        zone,
                        ZoneInput::SensorValue {
                            sensor,
                            payload: payload.clone(),
                        },
                    ),
                    DataRoute::ZoneSetpoint(zone) => {
                        Delivery::Zone(zone, ZoneInput::Setpoint(payload.clone()))
                    }
                    DataRoute::OutsideSensor(sensor) => Delivery::Outside(OutsideInput::SensorValue {
                        sensor,
                        payload: payload.clone(),
                    }),
                })
                .collect());
        }

        match topic.strip_prefix(self.control_prefix.as_str()) {
            Some(rest) => self.route_control(rest, payload).map(|d| d.into_iter().collect()),
            None => Ok(Vec::new()),
        }
    }

    fn route_control(&self, rest: &str, payload: &str) -> Result<Option<Delivery>> {
        let parts: Vec<&str> = rest.split('/').collect();
        let delivery = match parts.as_slice() {
            ["zone", zone, param] => {
                let Some(&id) = self.zones.get(*zone) else {
                    return Ok(None);
                };
                Delivery::Zone(id, ZoneInput::Parameter(ZoneParameter::parse(param, payload)?))
            }
            ["sensors", sensor, param] => {
                let Some(&target) = self.sensors.get(*sensor) else {
                    return Ok(None);
                };
                let parameter = SensorParameter::from_name(param)?;
                let value = parameter.parse_value(payload)?;
                match target {
                    SensorRef::Zone { zone, sensor } => Delivery::Zone(
                        zone,
                        ZoneInput::SensorParameter {
                            sensor,
                            parameter,
                            value,
                        },
                    ),
                    SensorRef::Outside(sensor) => Delivery::Outside(OutsideInput::SensorParameter {
                        sensor,
                        parameter,
                        value,
                    }),
                }
            }
            ["outside", "temperature_average_type"] => {
                Delivery::Outside(OutsideInput::AverageType(payload.trim().to_string()))
            }
            ["outside", other] => return Err(ParameterError::Unknown((*other).to_string()).into()),
            [name] => Delivery::Engine(EngineEvent::Control(GlobalCommand::parse(name, payload)?)),
            _ => return Ok(None),
        };
        Ok(Some(delivery))
    }
}
